//! Vulkan backend internals of a [`crate::GraphicsDevice`].

pub mod memory;

use core::ffi::CStr;

use ash::{prelude::VkResult, vk};
use parking_lot::Mutex;
use tracing::trace;

use crate::IntDashMap;
use memory::VkDeviceMemoryManager;

/// Number of pre-created command pools shared between worker submissions.
pub const SHARED_COMMAND_POOL_COUNT: usize = 4;

const DESCRIPTOR_POOL_MAX_SETS: u32 = 1000;
const DESCRIPTOR_COUNT_PER_TYPE: u32 = 1000;

/// Vulkan state behind a device.
///
/// The `instance` and `device` tables may wrap handles owned by an external
/// party; nothing here destroys them. Everything else (pools, caches,
/// the memory manager) is owned by the device.
pub struct VulkanDeviceState {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,

    pub queue_family_index: u32,
    pub graphics_queue: vk::Queue,

    pub physical_device_properties: vk::PhysicalDeviceProperties,
    pub physical_device_features: vk::PhysicalDeviceFeatures,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,

    /// Driver name as reported by `VkPhysicalDeviceDriverProperties`.
    pub driver_name: Option<String>,

    pub get_buffer_memory_requirements2: Option<vk::PFN_vkGetBufferMemoryRequirements2>,
    pub get_image_memory_requirements2: Option<vk::PFN_vkGetImageMemoryRequirements2>,

    /// Unset when `VK_EXT_debug_marker` is unavailable.
    pub debug_markers: Option<DebugMarkerFns>,

    pub memory_manager: VkDeviceMemoryManager,

    /// Format -> preferred filter cache.
    pub filters: IntDashMap<i32, vk::Filter>,

    pub graphics_queue_lock: Mutex<()>,
    pub graphics_command_pool: vk::CommandPool,
    pub descriptor_pool: vk::DescriptorPool,

    pub shared_graphics_command_pools: Mutex<Vec<SharedCommandPool>>,

    pub available_staging_buffers: Mutex<Vec<VkStagingBuffer>>,
    pub available_staging_textures: Mutex<Vec<VkStagingTexture>>,

    /// Keyed by raw `VkCommandBuffer` handle.
    pub submitted_staging_buffers: IntDashMap<u64, VkStagingBuffer>,
    pub submitted_staging_textures: IntDashMap<u64, VkStagingTexture>,
    pub submitted_shared_command_pools: IntDashMap<u64, SharedCommandPool>,
}

/// Staging buffer recycled between transfer submissions.
pub struct VkStagingBuffer {
    pub buffer: vk::Buffer,
    pub size: u64,
}

/// Staging texture recycled between transfer submissions.
pub struct VkStagingTexture {
    pub image: vk::Image,
    pub extent: vk::Extent3D,
}

/// Command pool handed out to transfer and secondary submissions.
pub struct SharedCommandPool {
    device: ash::Device,
    pool: vk::CommandPool,
    transient: bool,
}

impl SharedCommandPool {
    pub fn new(device: &ash::Device, queue_family_index: u32, transient: bool) -> VkResult<Self> {
        let mut flags = vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER;
        if transient {
            flags |= vk::CommandPoolCreateFlags::TRANSIENT;
        }

        let pool = unsafe {
            device.create_command_pool(
                &vk::CommandPoolCreateInfo::default()
                    .queue_family_index(queue_family_index)
                    .flags(flags),
                None,
            )?
        };
        trace!(?pool, "created shared command pool");

        Ok(Self {
            device: device.clone(),
            pool,
            transient,
        })
    }

    pub fn pool(&self) -> vk::CommandPool {
        self.pool
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

impl Drop for SharedCommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// `VK_EXT_debug_marker` entry points.
#[derive(Clone, Copy)]
pub struct DebugMarkerFns {
    pub set_object_name: vk::PFN_vkDebugMarkerSetObjectNameEXT,
    pub marker_begin: vk::PFN_vkCmdDebugMarkerBeginEXT,
    pub marker_end: vk::PFN_vkCmdDebugMarkerEndEXT,
    pub marker_insert: vk::PFN_vkCmdDebugMarkerInsertEXT,
}

impl DebugMarkerFns {
    /// Resolve the full entry point set, or report the extension unusable.
    pub fn resolve(
        mut lookup: impl FnMut(&CStr) -> vk::PFN_vkVoidFunction,
    ) -> Option<Self> {
        Some(Self {
            set_object_name: unsafe { typed_proc(lookup(c"vkDebugMarkerSetObjectNameEXT"))? },
            marker_begin: unsafe { typed_proc(lookup(c"vkCmdDebugMarkerBeginEXT"))? },
            marker_end: unsafe { typed_proc(lookup(c"vkCmdDebugMarkerEndEXT"))? },
            marker_insert: unsafe { typed_proc(lookup(c"vkCmdDebugMarkerInsertEXT"))? },
        })
    }
}

/// Reinterpret a resolved `vkVoidFunction` as a typed function pointer.
///
/// `T` must itself be a Vulkan function pointer type of matching size.
pub unsafe fn typed_proc<T>(f: vk::PFN_vkVoidFunction) -> Option<T> {
    const {
        assert!(size_of::<T>() == size_of::<unsafe extern "system" fn()>());
    }
    f.map(|f| unsafe { core::mem::transmute_copy::<_, T>(&f) })
}

/// Create the device's primary graphics command pool.
pub fn create_graphics_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> VkResult<vk::CommandPool> {
    unsafe {
        device.create_command_pool(
            &vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family_index)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER),
            None,
        )
    }
}

/// Create the descriptor pool backing the device's resource sets.
pub fn create_descriptor_pool(device: &ash::Device) -> VkResult<vk::DescriptorPool> {
    let sizes = [
        vk::DescriptorType::UNIFORM_BUFFER,
        vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        vk::DescriptorType::SAMPLED_IMAGE,
        vk::DescriptorType::SAMPLER,
        vk::DescriptorType::STORAGE_BUFFER,
        vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        vk::DescriptorType::STORAGE_IMAGE,
    ]
    .map(|ty| {
        vk::DescriptorPoolSize::default()
            .ty(ty)
            .descriptor_count(DESCRIPTOR_COUNT_PER_TYPE)
    });

    unsafe {
        device.create_descriptor_pool(
            &vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
                .max_sets(DESCRIPTOR_POOL_MAX_SETS)
                .pool_sizes(&sizes),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "system" fn noop() {}

    #[test]
    fn debug_marker_fns_need_every_entry_point() {
        // Extension absent entirely.
        assert!(DebugMarkerFns::resolve(|_| None).is_none());

        // One entry point missing is as bad as all of them missing.
        let partial = |name: &CStr| {
            if name == c"vkCmdDebugMarkerEndEXT" {
                None
            } else {
                Some(noop as unsafe extern "system" fn())
            }
        };
        assert!(DebugMarkerFns::resolve(partial).is_none());

        assert!(
            DebugMarkerFns::resolve(|_| Some(noop as unsafe extern "system" fn())).is_some()
        );
    }
}
