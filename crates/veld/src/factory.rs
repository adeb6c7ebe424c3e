use std::sync::Arc;

use crate::{GraphicsBackend, GraphicsDeviceFeatures, device::DeviceShared};

/// Creates backend resources on behalf of a [`crate::GraphicsDevice`].
///
/// The factory holds the same shared state as the device it was created
/// from; it requires that state to be fully populated, which is why every
/// construction path creates the factory last.
pub struct ResourceFactory {
    shared: Arc<DeviceShared>,
}

impl ResourceFactory {
    pub(crate) fn new(shared: Arc<DeviceShared>) -> Self {
        Self { shared }
    }

    pub fn backend(&self) -> GraphicsBackend {
        self.shared.backend
    }

    /// Capability record of the owning device; resource creation requests
    /// must be checked against it.
    pub fn features(&self) -> GraphicsDeviceFeatures {
        self.shared.features
    }
}
