use core::fmt;

/// Version of the native graphics API backing a device.
///
/// For Direct3D11 this is derived from the device feature level, for Vulkan
/// from the driver conformance version. Backends that cannot report one use
/// [`GraphicsApiVersion::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicsApiVersion {
    pub major: u32,
    pub minor: u32,
    pub subminor: u32,
    pub patch: u32,
}

impl GraphicsApiVersion {
    /// Version reported when the backend has no usable version information.
    pub const UNKNOWN: Self = Self {
        major: 0,
        minor: 0,
        subminor: 0,
        patch: 0,
    };

    pub const fn new(major: u32, minor: u32, subminor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            subminor,
            patch,
        }
    }

    /// Whether the version carries real information.
    pub const fn is_known(&self) -> bool {
        self.major != 0 || self.minor != 0 || self.subminor != 0 || self.patch != 0
    }
}

impl fmt::Display for GraphicsApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.subminor, self.patch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_version_is_default_and_not_known() {
        assert_eq!(GraphicsApiVersion::UNKNOWN, GraphicsApiVersion::default());
        assert!(!GraphicsApiVersion::UNKNOWN.is_known());
        assert!(GraphicsApiVersion::new(11, 1, 0, 0).is_known());
    }
}
