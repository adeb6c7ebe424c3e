//! Adopts a host application's live FNA3D renderer as a [`veld`] graphics
//! device.
//!
//! The host never hands over its device; this crate reads the backend tag
//! out of the opaque `FNA3D_Device` record, overlays the backend-specific
//! renderer state behind it, and assembles a [`GraphicsDevice`] around the
//! native handles found there. The resulting device shares the host's GPU
//! objects but presents nothing: its main swapchain stays detached and the
//! host keeps driving the screen.
//!
//! Adoption happens at most once per process. The first successful call to
//! [`get_or_adopt_device`] caches its device for everyone else.

mod backend;
pub mod error;
pub mod fna3d;

use once_cell::sync::OnceCell;
use tracing::debug;

pub use error::AdoptError;
pub use fna3d::Fna3dDevice;
pub use veld::{GraphicsBackend, GraphicsDevice};

static ADOPTED: OnceCell<GraphicsDevice> = OnceCell::new();

/// Adopt the host's graphics device, or return the one already adopted.
///
/// Retryable while the host is still starting up ([`AdoptError::DeviceNotReady`]);
/// fatal for backends without an adapter ([`AdoptError::UnsupportedBackend`]).
///
/// # Safety
/// `device` must be the host's live `FNA3D_Device*` (or null, which reports
/// [`AdoptError::DeviceNotReady`]), and must stay valid for the process
/// lifetime. Must be called on the host's render thread.
pub unsafe fn get_or_adopt_device(
    device: *mut Fna3dDevice,
) -> Result<&'static GraphicsDevice, AdoptError> {
    if let Some(adopted) = ADOPTED.get() {
        return Ok(adopted);
    }

    if device.is_null() {
        return Err(AdoptError::DeviceNotReady);
    }
    let driver_data = unsafe { (*device).driver_data };
    if driver_data.is_null() {
        return Err(AdoptError::DeviceNotReady);
    }

    let backend = unsafe { fna3d::detect_backend(device) }?;
    debug!(?backend, "adopting host graphics device");

    let adopted = match backend {
        #[cfg(windows)]
        GraphicsBackend::Direct3D11 => unsafe { backend::d3d11::adopt(driver_data) }?,
        #[cfg(not(windows))]
        GraphicsBackend::Direct3D11 => {
            return Err(AdoptError::UnsupportedBackend(fna3d::RENDERER_TYPE_D3D11));
        }
        GraphicsBackend::Vulkan => unsafe { backend::vulkan::adopt(driver_data) }?,
        GraphicsBackend::OpenGl => unsafe { backend::opengl::adopt(driver_data) }?,
    };

    // Concurrent first calls may each build a device; the first to publish
    // wins and the losers' devices are dropped unused. Callers wanting a
    // single construction serialize on their side.
    Ok(ADOPTED.get_or_init(|| adopted))
}

/// The device adopted earlier in this process, if any.
pub fn adopted_device() -> Option<&'static GraphicsDevice> {
    ADOPTED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;
    use core::ptr;

    // These paths never reach an adapter, so the process-wide cache stays
    // empty and the tests cannot interfere with each other.

    #[test]
    fn null_device_is_not_ready() {
        let result = unsafe { get_or_adopt_device(ptr::null_mut()) };
        assert!(matches!(result, Err(AdoptError::DeviceNotReady)));
        assert!(adopted_device().is_none());
    }

    #[test]
    fn device_without_renderer_state_is_not_ready() {
        let mut device: Fna3dDevice = unsafe { mem::zeroed() };
        let result = unsafe { get_or_adopt_device(&mut device) };
        assert!(matches!(result, Err(AdoptError::DeviceNotReady)));
    }

    #[test]
    fn unknown_backend_tag_fails_without_caching() {
        unsafe extern "C" fn report_unknown(
            _: *mut Fna3dDevice,
            out: *mut fna3d::SysRendererExt,
        ) {
            unsafe { (*out).renderer_type = 42 };
        }

        let mut device: Fna3dDevice = unsafe { mem::zeroed() };
        device.get_sys_renderer = Some(report_unknown);
        device.driver_data = &mut device as *mut _ as *mut _;

        let result = unsafe { get_or_adopt_device(&mut device) };
        assert!(matches!(result, Err(AdoptError::UnsupportedBackend(42))));
        assert!(adopted_device().is_none());
    }
}
