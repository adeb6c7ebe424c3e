//! The graphics device object and its construction paths.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    GraphicsApiVersion, GraphicsBackend, GraphicsDeviceFeatures, Swapchain,
    factory::ResourceFactory, info::BackendInfo, opengl::OpenGlDeviceState,
    vulkan::VulkanDeviceState,
};

#[cfg(windows)]
use crate::d3d11::D3d11DeviceState;

/// Backend-specific internal state of a [`GraphicsDevice`].
pub enum BackendState {
    #[cfg(windows)]
    D3d11(D3d11DeviceState),
    Vulkan(Box<VulkanDeviceState>),
    OpenGl(OpenGlDeviceState),
}

/// State shared between a device, its factory and its backend info.
pub(crate) struct DeviceShared {
    pub(crate) backend: GraphicsBackend,
    pub(crate) device_name: String,
    pub(crate) vendor_name: String,
    pub(crate) driver_info: Option<String>,
    pub(crate) api_version: GraphicsApiVersion,
    pub(crate) features: GraphicsDeviceFeatures,

    /// `None` when presentation is owned outside this device.
    pub(crate) main_swapchain: RwLock<Option<Swapchain>>,

    /// Set once [`GraphicsDevice::post_device_created`] has run.
    pub(crate) ready: AtomicBool,

    pub(crate) state: BackendState,
}

/// A fully initialized graphics device.
///
/// Every instance, however it was constructed, upholds the same invariants:
/// the capability record and api version are populated, every internal pool,
/// cache and lock exists (possibly empty), and the factory and backend info
/// objects are wired to the same underlying state.
pub struct GraphicsDevice {
    shared: Arc<DeviceShared>,
    factory: ResourceFactory,
    info: BackendInfo,
}

impl GraphicsDevice {
    pub fn backend(&self) -> GraphicsBackend {
        self.shared.backend
    }

    pub fn device_name(&self) -> &str {
        &self.shared.device_name
    }

    pub fn vendor_name(&self) -> &str {
        &self.shared.vendor_name
    }

    pub fn driver_info(&self) -> Option<&str> {
        self.shared.driver_info.as_deref()
    }

    pub fn api_version(&self) -> GraphicsApiVersion {
        self.shared.api_version
    }

    pub fn features(&self) -> GraphicsDeviceFeatures {
        self.shared.features
    }

    pub fn resource_factory(&self) -> &ResourceFactory {
        &self.factory
    }

    pub fn backend_info(&self) -> &BackendInfo {
        &self.info
    }

    /// Backend-specific internals. Exposed for backend integration layers;
    /// ordinary consumers go through the factory instead.
    pub fn state(&self) -> &BackendState {
        &self.shared.state
    }

    pub fn main_swapchain(&self) -> Option<Swapchain> {
        self.shared.main_swapchain.read().clone()
    }

    pub fn has_main_swapchain(&self) -> bool {
        self.shared.main_swapchain.read().is_some()
    }

    /// Remove the device's main swapchain, leaving the device swapchain-less.
    ///
    /// Used when presentation is handled by an external owner. Returns the
    /// detached swapchain, if any was installed.
    pub fn detach_main_swapchain(&self) -> Option<Swapchain> {
        let detached = self.shared.main_swapchain.write().take();
        if detached.is_some() {
            debug!("main swapchain detached");
        }
        detached
    }

    pub(crate) fn install_main_swapchain(&self, swapchain: Swapchain) {
        *self.shared.main_swapchain.write() = Some(swapchain);
    }

    /// Finish construction.
    ///
    /// Every construction path, ordinary or otherwise, must call this exactly
    /// once after all other state is in place.
    pub fn post_device_created(&self) {
        self.shared.ready.store(true, Ordering::Release);
        debug!(
            backend = ?self.shared.backend,
            device = %self.shared.device_name,
            api_version = %self.shared.api_version,
            "graphics device ready"
        );
    }

    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }
}

/// Assembles a [`GraphicsDevice`] around already-created backend state,
/// field by field, without going through a backend constructor path.
///
/// Fields not set before [`DeviceBuilder::finish`] keep neutral defaults;
/// the backend state itself is required up front. The factory and backend
/// info objects are created last, from the fully populated state.
pub struct DeviceBuilder {
    backend: GraphicsBackend,
    state: BackendState,
    device_name: String,
    vendor_name: String,
    driver_info: Option<String>,
    api_version: GraphicsApiVersion,
    features: GraphicsDeviceFeatures,
}

impl DeviceBuilder {
    pub fn new(backend: GraphicsBackend, state: BackendState) -> Self {
        Self {
            backend,
            state,
            device_name: String::new(),
            vendor_name: String::new(),
            driver_info: None,
            api_version: GraphicsApiVersion::UNKNOWN,
            features: GraphicsDeviceFeatures::empty(),
        }
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn vendor_name(mut self, name: impl Into<String>) -> Self {
        self.vendor_name = name.into();
        self
    }

    pub fn driver_info(mut self, info: impl Into<String>) -> Self {
        self.driver_info = Some(info.into());
        self
    }

    pub fn api_version(mut self, version: GraphicsApiVersion) -> Self {
        self.api_version = version;
        self
    }

    pub fn features(mut self, features: GraphicsDeviceFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn finish(self) -> GraphicsDevice {
        let shared = Arc::new(DeviceShared {
            backend: self.backend,
            device_name: self.device_name,
            vendor_name: self.vendor_name,
            driver_info: self.driver_info,
            api_version: self.api_version,
            features: self.features,
            main_swapchain: RwLock::new(None),
            ready: AtomicBool::new(false),
            state: self.state,
        });

        // Both take a fully populated device state as their only input, so
        // they come after everything else.
        let factory = ResourceFactory::new(Arc::clone(&shared));
        let info = BackendInfo::new(Arc::clone(&shared));

        GraphicsDevice {
            shared,
            factory,
            info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opengl;

    fn forged_device() -> GraphicsDevice {
        let state = BackendState::OpenGl(OpenGlDeviceState {
            context: core::ptr::null_mut(),
            platform_info: opengl::tests::stub_platform_info(),
        });

        DeviceBuilder::new(GraphicsBackend::OpenGl, state)
            .device_name("test device")
            .vendor_name("id:00001234")
            .api_version(GraphicsApiVersion::new(4, 6, 0, 0))
            .features(GraphicsDeviceFeatures::SAMPLER_ANISOTROPY)
            .finish()
    }

    #[test]
    fn built_device_exposes_populated_fields() {
        let device = forged_device();

        assert_eq!(device.backend(), GraphicsBackend::OpenGl);
        assert_eq!(device.device_name(), "test device");
        assert_eq!(device.vendor_name(), "id:00001234");
        assert_eq!(device.api_version(), GraphicsApiVersion::new(4, 6, 0, 0));
        assert!(
            device
                .features()
                .contains(GraphicsDeviceFeatures::SAMPLER_ANISOTROPY)
        );
        assert_eq!(device.resource_factory().backend(), GraphicsBackend::OpenGl);
    }

    #[test]
    fn built_device_has_no_main_swapchain() {
        let device = forged_device();

        assert!(!device.has_main_swapchain());
        assert!(device.main_swapchain().is_none());
        assert!(device.detach_main_swapchain().is_none());
    }

    #[test]
    fn post_device_created_marks_device_ready() {
        let device = forged_device();

        assert!(!device.is_ready());
        device.post_device_created();
        assert!(device.is_ready());
    }
}
