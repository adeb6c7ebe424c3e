//! Diagnostic access to the native objects behind a device.
//!
//! Interop layers use these to reach the raw backend handles a device wraps.
//! The info object keeps the device state alive, so the returned handles are
//! valid for as long as the info object is.

use core::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use crate::device::{BackendState, DeviceShared};

/// Backend-specific diagnostic info of a [`crate::GraphicsDevice`].
pub enum BackendInfo {
    #[cfg(windows)]
    D3d11(BackendInfoD3d11),
    Vulkan(BackendInfoVulkan),
    OpenGl(BackendInfoOpenGl),
}

impl BackendInfo {
    pub(crate) fn new(shared: Arc<DeviceShared>) -> Self {
        match &shared.state {
            #[cfg(windows)]
            BackendState::D3d11(state) => {
                use windows::core::Interface;

                Self::D3d11(BackendInfoD3d11 {
                    device: state.device.as_raw() as usize,
                    immediate_context: state.immediate_context.as_raw() as usize,
                    adapter: state.dxgi_adapter.as_raw() as usize,
                    _shared: shared.clone(),
                })
            }
            BackendState::Vulkan(state) => Self::Vulkan(BackendInfoVulkan {
                instance: state.instance.handle(),
                physical_device: state.physical_device,
                device: state.device.handle(),
                graphics_queue_family_index: state.queue_family_index,
                _shared: shared.clone(),
            }),
            BackendState::OpenGl(state) => Self::OpenGl(BackendInfoOpenGl {
                context: state.context as usize,
                _shared: shared.clone(),
            }),
        }
    }
}

/// Raw Direct3D11 handles behind a device.
#[cfg(windows)]
pub struct BackendInfoD3d11 {
    device: usize,
    immediate_context: usize,
    adapter: usize,
    _shared: Arc<DeviceShared>,
}

#[cfg(windows)]
impl BackendInfoD3d11 {
    /// `ID3D11Device*`
    pub fn device(&self) -> *mut c_void {
        self.device as _
    }

    /// `ID3D11DeviceContext*`
    pub fn immediate_context(&self) -> *mut c_void {
        self.immediate_context as _
    }

    /// `IDXGIAdapter*`
    pub fn adapter(&self) -> *mut c_void {
        self.adapter as _
    }
}

/// Raw Vulkan handles behind a device.
pub struct BackendInfoVulkan {
    instance: vk::Instance,
    physical_device: vk::PhysicalDevice,
    device: vk::Device,
    graphics_queue_family_index: u32,
    _shared: Arc<DeviceShared>,
}

impl BackendInfoVulkan {
    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device(&self) -> vk::Device {
        self.device
    }

    pub fn graphics_queue_family_index(&self) -> u32 {
        self.graphics_queue_family_index
    }
}

/// Raw OpenGL context behind a device.
pub struct BackendInfoOpenGl {
    context: usize,
    _shared: Arc<DeviceShared>,
}

impl BackendInfoOpenGl {
    pub fn context(&self) -> *mut c_void {
        self.context as _
    }
}
