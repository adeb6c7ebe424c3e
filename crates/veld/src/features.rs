use bitflags::bitflags;

bitflags! {
    /// Optional capabilities a [`crate::GraphicsDevice`] may support.
    ///
    /// Consumers must check the relevant flag before using the associated
    /// functionality; a cleared flag means the backend either cannot do it or
    /// did not report support for it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GraphicsDeviceFeatures: u32 {
        const COMPUTE_SHADER = 1 << 0;
        const GEOMETRY_SHADER = 1 << 1;
        const TESSELLATION_SHADERS = 1 << 2;
        const MULTIPLE_VIEWPORTS = 1 << 3;
        const SAMPLER_LOD_BIAS = 1 << 4;
        const DRAW_BASE_VERTEX = 1 << 5;
        const DRAW_BASE_INSTANCE = 1 << 6;
        const DRAW_INDIRECT = 1 << 7;
        const DRAW_INDIRECT_BASE_INSTANCE = 1 << 8;
        const FILL_MODE_WIREFRAME = 1 << 9;
        const SAMPLER_ANISOTROPY = 1 << 10;
        const DEPTH_CLIP_DISABLE = 1 << 11;
        const TEXTURE1_D = 1 << 12;
        const INDEPENDENT_BLEND = 1 << 13;
        const STRUCTURED_BUFFER = 1 << 14;
        const SUBSET_TEXTURE_VIEW = 1 << 15;
        const COMMAND_LIST_DEBUG_MARKERS = 1 << 16;
        const BUFFER_RANGE_BINDING = 1 << 17;
        const SHADER_FLOAT64 = 1 << 18;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_capabilities() {
        assert!(GraphicsDeviceFeatures::default().is_empty());
    }
}
