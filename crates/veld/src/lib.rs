//! Device layer of the Veld graphics abstraction.
//!
//! This crate defines the graphics device object the rest of the stack
//! programs against: the backend-agnostic [`GraphicsDevice`] with its
//! per-backend internal state, the [`GraphicsDeviceFeatures`] capability
//! record, and the resource factory / backend info objects hanging off a
//! device. Devices are normally constructed through a backend constructor
//! path (see [`GraphicsDevice::new_opengl`]); the [`device::DeviceBuilder`]
//! exists for layers that assemble a device around externally created native
//! handles instead.

pub mod device;
pub mod factory;
pub mod info;
pub mod opengl;
pub mod swapchain;
pub mod vulkan;

#[cfg(windows)]
pub mod d3d11;

mod features;
mod types;
mod version;

pub use device::{BackendState, DeviceBuilder, GraphicsDevice};
pub use factory::ResourceFactory;
pub use features::GraphicsDeviceFeatures;
pub use info::BackendInfo;
pub use swapchain::{Framebuffer, Swapchain};
pub use types::IntDashMap;
pub use version::GraphicsApiVersion;

/// Graphics API a [`GraphicsDevice`] is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBackend {
    Direct3D11,
    Vulkan,
    OpenGl,
}

/// Options controlling device construction.
///
/// Only meaningful for the constructor paths; adopted devices inherit the
/// equivalent decisions from the native device they wrap.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphicsDeviceOptions {
    /// Request a debug-enabled native device.
    pub debug: bool,

    /// Map depth to `[0, 1]` instead of `[-1, 1]` where the backend allows
    /// choosing.
    pub prefer_depth_range_zero_to_one: bool,

    /// Synchronize presentation to vertical blank.
    pub sync_to_vertical_blank: bool,
}
