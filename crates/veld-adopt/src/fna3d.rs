//! Read-only overlays of FNA3D's internal device record.
//!
//! The host keeps its renderer state behind `FNA3D_Device*`; this module
//! mirrors that record's layout so it can be read in place, without copies
//! and without the host's cooperation. Field order and sizes are pinned to
//! the FNA3D revision the host embeds and must be re-verified whenever the
//! host updates it.
//! <https://github.com/FNA-XNA/FNA3D/blob/master/include/FNA3D.h>

use core::ffi::c_void;

use tracing::trace;

use crate::error::AdoptError;
use veld::GraphicsBackend;

/// `FNA3D_SysRendererTypeEXT` tags.
pub const RENDERER_TYPE_OPENGL: i32 = 0;
pub const RENDERER_TYPE_VULKAN: i32 = 1;
pub const RENDERER_TYPE_D3D11: i32 = 2;
/// Removed upstream; classifies as unsupported.
pub const RENDERER_TYPE_METAL: i32 = 3;

const SYS_RENDERER_VERSION_EXT: u32 = 0;

pub type GetSysRendererFn = unsafe extern "C" fn(*mut Fna3dDevice, *mut SysRendererExt);

/// `FNA3D_SysRendererEXT`: the small header the device fills with its
/// backend tag plus a backend-specific payload union this crate ignores.
#[repr(C)]
pub struct SysRendererExt {
    pub version: u32,
    pub renderer_type: i32,
    renderer: [u64; 8],
}

impl SysRendererExt {
    pub const fn zeroed() -> Self {
        Self {
            version: SYS_RENDERER_VERSION_EXT,
            renderer_type: 0,
            renderer: [0; 8],
        }
    }
}

/// Reinterpret host-owned memory as a `T`-shaped record, in place.
///
/// # Safety
/// `ptr` must point to live, readable memory of at least `size_of::<T>()`
/// bytes laid out exactly as `T` declares, and must stay valid for `'a`.
/// The view is read-only; never write through it.
pub(crate) unsafe fn overlay_ref<'a, T>(ptr: *mut c_void) -> &'a T {
    unsafe { &*ptr.cast::<T>() }
}

/// `FNA3D_Device`: the host renderer's dispatch record.
///
/// Only `get_sys_renderer` and `driver_data` are ever used; the remaining
/// entries exist to keep the two at their pinned offsets.
#[repr(C)]
pub struct Fna3dDevice {
    pub destroy_device: *mut c_void,
    pub swap_buffers: *mut c_void,
    pub clear: *mut c_void,
    pub draw_indexed_primitives: *mut c_void,
    pub draw_instanced_primitives: *mut c_void,
    pub draw_primitives: *mut c_void,
    pub set_viewport: *mut c_void,
    pub set_scissor_rect: *mut c_void,
    pub get_blend_factor: *mut c_void,
    pub set_blend_factor: *mut c_void,
    pub get_multi_sample_mask: *mut c_void,
    pub set_multi_sample_mask: *mut c_void,
    pub get_reference_stencil: *mut c_void,
    pub set_reference_stencil: *mut c_void,
    pub set_blend_state: *mut c_void,
    pub set_depth_stencil_state: *mut c_void,
    pub apply_rasterizer_state: *mut c_void,
    pub verify_sampler: *mut c_void,
    pub verify_vertex_sampler: *mut c_void,
    pub apply_vertex_buffer_bindings: *mut c_void,
    pub set_render_targets: *mut c_void,
    pub resolve_target: *mut c_void,
    pub reset_backbuffer: *mut c_void,
    pub read_backbuffer: *mut c_void,
    pub get_backbuffer_size: *mut c_void,
    pub get_backbuffer_surface_format: *mut c_void,
    pub get_backbuffer_depth_format: *mut c_void,
    pub get_backbuffer_multi_sample_count: *mut c_void,
    pub create_texture_2d: *mut c_void,
    pub create_texture_3d: *mut c_void,
    pub create_texture_cube: *mut c_void,
    pub add_dispose_texture: *mut c_void,
    pub set_texture_data_2d: *mut c_void,
    pub set_texture_data_3d: *mut c_void,
    pub set_texture_data_cube: *mut c_void,
    pub set_texture_data_yuv: *mut c_void,
    pub get_texture_data_2d: *mut c_void,
    pub get_texture_data_3d: *mut c_void,
    pub get_texture_data_cube: *mut c_void,
    pub gen_color_renderbuffer: *mut c_void,
    pub gen_depth_stencil_renderbuffer: *mut c_void,
    pub add_dispose_renderbuffer: *mut c_void,
    pub gen_vertex_buffer: *mut c_void,
    pub add_dispose_vertex_buffer: *mut c_void,
    pub set_vertex_buffer_data: *mut c_void,
    pub get_vertex_buffer_data: *mut c_void,
    pub gen_index_buffer: *mut c_void,
    pub add_dispose_index_buffer: *mut c_void,
    pub set_index_buffer_data: *mut c_void,
    pub get_index_buffer_data: *mut c_void,
    pub create_effect: *mut c_void,
    pub clone_effect: *mut c_void,
    pub add_dispose_effect: *mut c_void,
    pub set_effect_technique: *mut c_void,
    pub apply_effect: *mut c_void,
    pub begin_pass_restore: *mut c_void,
    pub end_pass_restore: *mut c_void,
    pub create_query: *mut c_void,
    pub add_dispose_query: *mut c_void,
    pub query_begin: *mut c_void,
    pub query_end: *mut c_void,
    pub query_complete: *mut c_void,
    pub query_pixel_count: *mut c_void,
    pub supports_dxt1: *mut c_void,
    pub supports_s3tc: *mut c_void,
    pub supports_bc7: *mut c_void,
    pub supports_hardware_instancing: *mut c_void,
    pub supports_no_overwrite: *mut c_void,
    pub supports_srgb_render_targets: *mut c_void,
    pub get_max_texture_slots: *mut c_void,
    pub get_max_multi_sample_count: *mut c_void,
    pub set_string_marker: *mut c_void,

    /// `FNA3D_GetSysRendererEXT`
    pub get_sys_renderer: Option<GetSysRendererFn>,

    pub create_sys_texture: *mut c_void,

    /// Backend-specific renderer record; the opaque handle every adapter
    /// overlays with its own layout.
    pub driver_data: *mut c_void,
}

/// Ask the host device which backend produced it.
///
/// # Safety
/// `device` must point to a live, fully initialized `FNA3D_Device`.
pub(crate) unsafe fn detect_backend(
    device: *mut Fna3dDevice,
) -> Result<GraphicsBackend, AdoptError> {
    let get_sys_renderer =
        unsafe { (*device).get_sys_renderer }.ok_or(AdoptError::DeviceNotReady)?;

    let mut sys_renderer = SysRendererExt::zeroed();
    unsafe { get_sys_renderer(device, &mut sys_renderer) };
    trace!(tag = sys_renderer.renderer_type, "host renderer classified");

    classify(sys_renderer.renderer_type)
}

/// Map an `FNA3D_SysRendererTypeEXT` tag to the backend it belongs to.
pub(crate) fn classify(tag: i32) -> Result<GraphicsBackend, AdoptError> {
    match tag {
        RENDERER_TYPE_OPENGL => Ok(GraphicsBackend::OpenGl),
        RENDERER_TYPE_VULKAN => Ok(GraphicsBackend::Vulkan),
        RENDERER_TYPE_D3D11 => Ok(GraphicsBackend::Direct3D11),
        other => Err(AdoptError::UnsupportedBackend(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn sys_renderer_header_matches_pinned_size() {
        // FNA3D declares the struct 72 bytes; the tag sits right after the
        // version field.
        assert_eq!(mem::size_of::<SysRendererExt>(), 72);
        assert_eq!(mem::offset_of!(SysRendererExt, renderer_type), 4);
    }

    #[test]
    fn known_tags_classify_to_their_backend() {
        assert!(matches!(
            classify(RENDERER_TYPE_OPENGL),
            Ok(GraphicsBackend::OpenGl)
        ));
        assert!(matches!(
            classify(RENDERER_TYPE_VULKAN),
            Ok(GraphicsBackend::Vulkan)
        ));
        assert!(matches!(
            classify(RENDERER_TYPE_D3D11),
            Ok(GraphicsBackend::Direct3D11)
        ));
    }

    #[test]
    fn unknown_tags_are_unsupported() {
        assert!(matches!(
            classify(RENDERER_TYPE_METAL),
            Err(AdoptError::UnsupportedBackend(RENDERER_TYPE_METAL))
        ));
        assert!(matches!(
            classify(99),
            Err(AdoptError::UnsupportedBackend(99))
        ));
        assert!(matches!(
            classify(-1),
            Err(AdoptError::UnsupportedBackend(-1))
        ));
    }

    #[test]
    fn detect_backend_reads_the_tag_through_the_host_accessor() {
        unsafe extern "C" fn report_vulkan(_: *mut Fna3dDevice, out: *mut SysRendererExt) {
            unsafe { (*out).renderer_type = RENDERER_TYPE_VULKAN };
        }

        let mut device: Fna3dDevice = unsafe { mem::zeroed() };
        device.get_sys_renderer = Some(report_vulkan);

        let backend = unsafe { detect_backend(&mut device) };
        assert!(matches!(backend, Ok(GraphicsBackend::Vulkan)));
    }

    #[test]
    fn half_initialized_device_is_not_ready() {
        let mut device: Fna3dDevice = unsafe { mem::zeroed() };
        let result = unsafe { detect_backend(&mut device) };
        assert!(matches!(result, Err(AdoptError::DeviceNotReady)));
    }
}
