//! OpenGL adoption adapter.
//!
//! The host created its context through SDL, so the adapter resolves the
//! SDL GL entry points out of the SDL library already loaded in the
//! process and wires them into the device's platform function table. The
//! context and window stay owned by the host throughout.

use core::ffi::{c_char, c_int, c_void};
use std::ffi::CString;
use std::sync::Arc;

use anyhow::{Context, ensure};
use libloading::Library;
use tracing::debug;

use crate::fna3d::{Fna3dDevice, overlay_ref};
use veld::{GraphicsDevice, GraphicsDeviceOptions, opengl::OpenGlPlatformInfo};

/// Leading fields of `OpenGLRenderer` from FNA3D's OpenGL driver, pinned
/// to the upstream layout. Only `context` is read.
/// <https://github.com/FNA-XNA/FNA3D/blob/master/src/FNA3D_Driver_OpenGL.h>
#[repr(C)]
pub(crate) struct OpenGlRenderer {
    pub parent_device: *mut Fna3dDevice,
    pub allocator: *mut c_void,

    /// `SDL_GLContext`
    pub context: *mut c_void,
    pub use_es3: u8,
    pub use_core_profile: u8,
    pub is_egl: u8,
}

/// SDL GL entry points resolved from the host's SDL library.
struct SdlGl {
    get_proc_address: unsafe extern "C" fn(*const c_char) -> *mut c_void,
    make_current: unsafe extern "C" fn(*mut c_void, *mut c_void) -> c_int,
    get_current_context: unsafe extern "C" fn() -> *mut c_void,
    get_current_window: unsafe extern "C" fn() -> *mut c_void,
    delete_context: unsafe extern "C" fn(*mut c_void),
    swap_window: unsafe extern "C" fn(*mut c_void),
    set_swap_interval: unsafe extern "C" fn(c_int) -> c_int,

    /// Keeps the resolved entry points loaded.
    _library: Library,
}

#[cfg(windows)]
const SDL_LIBRARY_CANDIDATES: &[&str] = &["SDL2.dll"];
#[cfg(target_os = "macos")]
const SDL_LIBRARY_CANDIDATES: &[&str] = &["libSDL2-2.0.0.dylib", "libSDL2.dylib"];
#[cfg(not(any(windows, target_os = "macos")))]
const SDL_LIBRARY_CANDIDATES: &[&str] = &["libSDL2-2.0.so.0", "libSDL2.so"];

impl SdlGl {
    /// # Safety
    /// The process must already host a healthy SDL2; loading by name binds
    /// to that same copy rather than bringing in a second one.
    unsafe fn load() -> anyhow::Result<Self> {
        let library = SDL_LIBRARY_CANDIDATES
            .iter()
            .find_map(|name| unsafe { Library::new(name) }.ok())
            .with_context(|| format!("SDL library not loadable (tried {SDL_LIBRARY_CANDIDATES:?})"))?;

        macro_rules! resolve {
            ($name:literal) => {
                *unsafe { library.get(concat!($name, "\0").as_bytes()) }
                    .context(concat!($name, " missing from SDL library"))?
            };
        }

        Ok(Self {
            get_proc_address: resolve!("SDL_GL_GetProcAddress"),
            make_current: resolve!("SDL_GL_MakeCurrent"),
            get_current_context: resolve!("SDL_GL_GetCurrentContext"),
            get_current_window: resolve!("SDL_GL_GetCurrentWindow"),
            delete_context: resolve!("SDL_GL_DeleteContext"),
            swap_window: resolve!("SDL_GL_SwapWindow"),
            set_swap_interval: resolve!("SDL_GL_SetSwapInterval"),
            _library: library,
        })
    }
}

/// Build a device around the host's live OpenGL renderer.
///
/// Must run on the thread where the host's context is current; the window
/// for presentation calls is taken from that binding.
///
/// # Safety
/// `driver_data` must point to the host's `OpenGLRenderer` record and the
/// context inside it must stay valid for the process lifetime.
#[tracing::instrument]
pub(crate) unsafe fn adopt(driver_data: *mut c_void) -> anyhow::Result<GraphicsDevice> {
    let renderer = unsafe { overlay_ref::<OpenGlRenderer>(driver_data) };
    let context = renderer.context;
    ensure!(!context.is_null(), "host GL context handle is null");

    let sdl = Arc::new(unsafe { SdlGl::load() }?);
    let window = unsafe { (sdl.get_current_window)() };
    ensure!(
        !window.is_null(),
        "no window bound to the current GL context"
    );
    debug!(
        use_es3 = renderer.use_es3 != 0,
        core_profile = renderer.use_core_profile != 0,
        "adopting OpenGL device"
    );

    // Raw handles cross into Send + Sync closures as plain integers; every
    // use goes back through SDL, which does its own thread policing.
    let window = window as usize;
    let platform_info = OpenGlPlatformInfo {
        gl_context: context,
        get_proc_address: {
            let sdl = Arc::clone(&sdl);
            Box::new(move |name| match CString::new(name) {
                Ok(name) => unsafe { (sdl.get_proc_address)(name.as_ptr()) },
                Err(_) => core::ptr::null_mut(),
            })
        },
        make_current: {
            let sdl = Arc::clone(&sdl);
            Box::new(move |context| {
                let _ = unsafe { (sdl.make_current)(window as *mut c_void, context) };
            })
        },
        get_current_context: {
            let sdl = Arc::clone(&sdl);
            Box::new(move || unsafe { (sdl.get_current_context)() })
        },
        clear_current_context: {
            let sdl = Arc::clone(&sdl);
            Box::new(move || {
                let _ = unsafe { (sdl.make_current)(core::ptr::null_mut(), core::ptr::null_mut()) };
            })
        },
        delete_context: {
            let sdl = Arc::clone(&sdl);
            Box::new(move |context| unsafe { (sdl.delete_context)(context) })
        },
        swap_buffers: {
            let sdl = Arc::clone(&sdl);
            Box::new(move || unsafe { (sdl.swap_window)(window as *mut c_void) })
        },
        set_sync_to_vertical_blank: {
            let sdl = Arc::clone(&sdl);
            Box::new(move |sync| {
                let _ = unsafe { (sdl.set_swap_interval)(if sync { 1 } else { 0 }) };
            })
        },
    };

    let adopted = GraphicsDevice::new_opengl(
        GraphicsDeviceOptions {
            sync_to_vertical_blank: true,
            ..Default::default()
        },
        platform_info,
        1,
        1,
    );

    // Presentation stays with the host; the placeholder swapchain the
    // constructor installed has no surface behind it.
    adopted.detach_main_swapchain();

    // The constructor may have rebound the context; hand it back.
    let _ = unsafe { (sdl.make_current)(window as *mut c_void, context) };

    Ok(adopted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn renderer_record_puts_the_context_third() {
        assert_eq!(
            mem::offset_of!(OpenGlRenderer, context),
            2 * mem::size_of::<usize>()
        );
        assert_eq!(
            mem::offset_of!(OpenGlRenderer, use_es3),
            3 * mem::size_of::<usize>()
        );
    }
}
