//! OpenGL backend of a [`crate::GraphicsDevice`].
//!
//! Unlike the other backends, the OpenGL device is built around an
//! externally created context by design: the embedder supplies an
//! [`OpenGlPlatformInfo`] function table delegating context and presentation
//! control to whatever windowing layer owns the context.

use core::ffi::{CStr, c_char, c_void};
use core::mem;

use crate::{
    BackendState, DeviceBuilder, GraphicsApiVersion, GraphicsBackend, GraphicsDevice,
    GraphicsDeviceFeatures, GraphicsDeviceOptions, Swapchain,
};

const GL_VENDOR: u32 = 0x1F00;
const GL_RENDERER: u32 = 0x1F01;
const GL_VERSION: u32 = 0x1F02;

type GlGetStringFn = unsafe extern "system" fn(u32) -> *const c_char;

/// Platform function table for an externally owned OpenGL context.
///
/// Every operation delegates to the windowing layer that created the
/// context; the device never talks to the platform directly.
pub struct OpenGlPlatformInfo {
    /// The context the device renders with. Owned by the platform side.
    pub gl_context: *mut c_void,

    pub get_proc_address: Box<dyn Fn(&str) -> *mut c_void + Send + Sync>,
    pub make_current: Box<dyn Fn(*mut c_void) + Send + Sync>,
    pub get_current_context: Box<dyn Fn() -> *mut c_void + Send + Sync>,
    pub clear_current_context: Box<dyn Fn() + Send + Sync>,
    pub delete_context: Box<dyn Fn(*mut c_void) + Send + Sync>,
    pub swap_buffers: Box<dyn Fn() + Send + Sync>,
    pub set_sync_to_vertical_blank: Box<dyn Fn(bool) + Send + Sync>,
}

/// OpenGL state behind a device.
pub struct OpenGlDeviceState {
    /// Raw context handle, same as `platform_info.gl_context`.
    pub context: *mut c_void,
    pub platform_info: OpenGlPlatformInfo,
}

// The context handle is only ever used through the platform function table,
// which serializes against the windowing layer owning the context.
unsafe impl Send for OpenGlDeviceState {}
unsafe impl Sync for OpenGlDeviceState {}

impl GraphicsDevice {
    /// Build a device around the context described by `platform_info`.
    ///
    /// The context must be current on the calling thread. A default
    /// swapchain of `width` x `height` is installed; embedders that keep
    /// presentation to themselves detach it afterwards.
    pub fn new_opengl(
        options: GraphicsDeviceOptions,
        platform_info: OpenGlPlatformInfo,
        width: u32,
        height: u32,
    ) -> GraphicsDevice {
        let strings = query_context_strings(&platform_info);
        let api_version = strings
            .version
            .as_deref()
            .and_then(parse_gl_version)
            .unwrap_or(GraphicsApiVersion::UNKNOWN);

        (platform_info.set_sync_to_vertical_blank)(options.sync_to_vertical_blank);

        let context = platform_info.gl_context;
        let state = OpenGlDeviceState {
            context,
            platform_info,
        };

        let mut builder = DeviceBuilder::new(GraphicsBackend::OpenGl, BackendState::OpenGl(state))
            .device_name(strings.renderer.unwrap_or_else(|| "OpenGL".to_owned()))
            .vendor_name(strings.vendor.unwrap_or_else(|| "unknown".to_owned()))
            .api_version(api_version)
            .features(baseline_features());
        if let Some(version) = strings.version {
            builder = builder.driver_info(version);
        }
        let device = builder.finish();

        device.install_main_swapchain(Swapchain::new(
            width,
            height,
            options.sync_to_vertical_blank,
        ));
        device.post_device_created();
        device
    }
}

/// Feature set every context accepted by this backend provides.
///
/// The backend targets plain GL 3.x contexts, so the capabilities that need
/// newer GL or ubiquitous extensions stay off rather than being probed.
fn baseline_features() -> GraphicsDeviceFeatures {
    GraphicsDeviceFeatures::SAMPLER_LOD_BIAS
        | GraphicsDeviceFeatures::DRAW_BASE_VERTEX
        | GraphicsDeviceFeatures::DRAW_INDIRECT
        | GraphicsDeviceFeatures::SAMPLER_ANISOTROPY
        | GraphicsDeviceFeatures::DEPTH_CLIP_DISABLE
        | GraphicsDeviceFeatures::TEXTURE1_D
        | GraphicsDeviceFeatures::INDEPENDENT_BLEND
        | GraphicsDeviceFeatures::FILL_MODE_WIREFRAME
}

#[derive(Default)]
struct ContextStrings {
    vendor: Option<String>,
    renderer: Option<String>,
    version: Option<String>,
}

/// Read the identification strings of the current context, when the
/// platform can resolve `glGetString` at all.
fn query_context_strings(platform: &OpenGlPlatformInfo) -> ContextStrings {
    let get_string = (platform.get_proc_address)("glGetString");
    if get_string.is_null() {
        return ContextStrings::default();
    }
    let get_string: GlGetStringFn = unsafe { mem::transmute(get_string) };

    let read = |name: u32| {
        let ptr = unsafe { get_string(name) };
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
        }
    };

    ContextStrings {
        vendor: read(GL_VENDOR),
        renderer: read(GL_RENDERER),
        version: read(GL_VERSION),
    }
}

/// Parse a `GL_VERSION` string such as `4.6.0 NVIDIA 551.23` or
/// `OpenGL ES 3.2 Mesa 23.1`.
fn parse_gl_version(version: &str) -> Option<GraphicsApiVersion> {
    let version = version.strip_prefix("OpenGL ES ").unwrap_or(version);
    let first = version.split_whitespace().next()?;

    let mut parts = first.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let subminor = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);

    Some(GraphicsApiVersion::new(major, minor, subminor, 0))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn stub_platform_info() -> OpenGlPlatformInfo {
        OpenGlPlatformInfo {
            gl_context: core::ptr::null_mut(),
            get_proc_address: Box::new(|_| core::ptr::null_mut()),
            make_current: Box::new(|_| {}),
            get_current_context: Box::new(core::ptr::null_mut),
            clear_current_context: Box::new(|| {}),
            delete_context: Box::new(|_| {}),
            swap_buffers: Box::new(|| {}),
            set_sync_to_vertical_blank: Box::new(|_| {}),
        }
    }

    #[test]
    fn parses_desktop_and_es_version_strings() {
        assert_eq!(
            parse_gl_version("4.6.0 NVIDIA 551.23"),
            Some(GraphicsApiVersion::new(4, 6, 0, 0))
        );
        assert_eq!(
            parse_gl_version("3.3"),
            Some(GraphicsApiVersion::new(3, 3, 0, 0))
        );
        assert_eq!(
            parse_gl_version("OpenGL ES 3.2 Mesa 23.1.4"),
            Some(GraphicsApiVersion::new(3, 2, 0, 0))
        );
        assert_eq!(parse_gl_version("garbage"), None);
    }

    #[test]
    fn constructor_installs_then_detach_removes_default_swapchain() {
        let device = GraphicsDevice::new_opengl(
            GraphicsDeviceOptions {
                sync_to_vertical_blank: true,
                ..Default::default()
            },
            stub_platform_info(),
            1,
            1,
        );

        assert!(device.is_ready());
        assert!(device.has_main_swapchain());

        let detached = device.detach_main_swapchain().expect("default swapchain");
        assert_eq!(detached.framebuffer().width(), 1);
        assert!(detached.sync_to_vertical_blank());
        assert!(!device.has_main_swapchain());
        assert!(device.main_swapchain().is_none());
    }

    #[test]
    fn unresolvable_gl_strings_fall_back_to_generic_names() {
        let device = GraphicsDevice::new_opengl(
            GraphicsDeviceOptions::default(),
            stub_platform_info(),
            640,
            480,
        );

        assert_eq!(device.backend(), GraphicsBackend::OpenGl);
        assert_eq!(device.device_name(), "OpenGL");
        assert_eq!(device.api_version(), GraphicsApiVersion::UNKNOWN);
    }
}
