//! Device memory bookkeeping for the Vulkan backend.

use ash::vk;
use parking_lot::Mutex;

/// A device memory allocation tracked by the manager.
pub struct VkMemoryBlock {
    pub memory: vk::DeviceMemory,
    pub size: u64,
    pub type_index: u32,
}

/// Allocates and tracks `VkDeviceMemory` for the owning device.
///
/// Holds the extended memory-requirement entry points when the runtime
/// provides them; callers fall back to the core queries otherwise.
pub struct VkDeviceMemoryManager {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    buffer_image_granularity: u64,
    get_buffer_memory_requirements2: Option<vk::PFN_vkGetBufferMemoryRequirements2>,
    get_image_memory_requirements2: Option<vk::PFN_vkGetImageMemoryRequirements2>,
    blocks: Mutex<Vec<VkMemoryBlock>>,
}

impl VkDeviceMemoryManager {
    pub fn new(
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        buffer_image_granularity: u64,
        get_buffer_memory_requirements2: Option<vk::PFN_vkGetBufferMemoryRequirements2>,
        get_image_memory_requirements2: Option<vk::PFN_vkGetImageMemoryRequirements2>,
    ) -> Self {
        Self {
            device,
            physical_device,
            buffer_image_granularity,
            get_buffer_memory_requirements2,
            get_image_memory_requirements2,
            blocks: Mutex::new(Vec::new()),
        }
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn buffer_image_granularity(&self) -> u64 {
        self.buffer_image_granularity
    }

    pub fn has_extended_requirement_queries(&self) -> bool {
        self.get_buffer_memory_requirements2.is_some()
            && self.get_image_memory_requirements2.is_some()
    }

    /// Memory requirements of `buffer`, through the extended query when
    /// available.
    pub unsafe fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        match self.get_buffer_memory_requirements2 {
            Some(get) => {
                let info = vk::BufferMemoryRequirementsInfo2::default().buffer(buffer);
                let mut requirements = vk::MemoryRequirements2::default();
                unsafe { get(self.device.handle(), &info, &mut requirements) };
                requirements.memory_requirements
            }
            None => unsafe { self.device.get_buffer_memory_requirements(buffer) },
        }
    }

    /// Memory requirements of `image`, through the extended query when
    /// available.
    pub unsafe fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        match self.get_image_memory_requirements2 {
            Some(get) => {
                let info = vk::ImageMemoryRequirementsInfo2::default().image(image);
                let mut requirements = vk::MemoryRequirements2::default();
                unsafe { get(self.device.handle(), &info, &mut requirements) };
                requirements.memory_requirements
            }
            None => unsafe { self.device.get_image_memory_requirements(image) },
        }
    }

    pub fn track_block(&self, block: VkMemoryBlock) {
        self.blocks.lock().push(block);
    }

    pub fn allocated_block_count(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.blocks.lock().iter().map(|block| block.size).sum()
    }
}
