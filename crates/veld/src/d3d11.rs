//! Direct3D11 backend internals of a [`crate::GraphicsDevice`].

use core::ffi::c_void;
use core::sync::atomic::AtomicBool;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use windows::Win32::Graphics::{
    Direct3D11::{ID3D11Buffer, ID3D11Device, ID3D11DeviceContext},
    Dxgi::IDXGIAdapter,
};

/// Direct3D11 state behind a device.
///
/// The COM pointers are additional references on objects that may be owned
/// elsewhere; dropping this state releases our references only.
pub struct D3d11DeviceState {
    pub device: ID3D11Device,
    pub immediate_context: ID3D11DeviceContext,
    pub dxgi_adapter: IDXGIAdapter,

    pub device_id: u32,

    /// Driver supports resource creation from multiple threads.
    pub supports_concurrent_resources: bool,

    /// Driver supports deferred-context command lists.
    pub supports_command_lists: bool,

    pub is_debug_enabled: bool,

    /// Serializes work recorded on the immediate context.
    pub immediate_context_lock: Mutex<()>,

    pub mapped_resources: Mutex<HashMap<MappedResourceKey, MappedResourceInfo>>,
    pub available_staging_buffers: Mutex<Vec<D3d11StagingBuffer>>,
    pub reset_events: Mutex<Vec<Arc<ResetEvent>>>,
}

// The contained COM pointers and mapped data pointers are used under the
// state's own locks; cross-thread use follows the D3D11 threading contract.
unsafe impl Send for D3d11DeviceState {}
unsafe impl Sync for D3d11DeviceState {}

/// Identifies one mapped subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappedResourceKey {
    /// Raw resource pointer.
    pub resource: usize,
    pub subresource: u32,
}

/// Bookkeeping for a currently mapped subresource.
pub struct MappedResourceInfo {
    pub data: *mut c_void,
    pub row_pitch: u32,
    pub depth_pitch: u32,
    pub ref_count: u32,
}

/// Staging buffer recycled between uploads.
pub struct D3d11StagingBuffer {
    pub buffer: ID3D11Buffer,
    pub size: u32,
}

/// One-shot signal handed to callers waiting on a device reset.
#[derive(Default)]
pub struct ResetEvent {
    pub signaled: AtomicBool,
}
