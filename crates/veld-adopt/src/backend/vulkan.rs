//! Vulkan adoption adapter.
//!
//! The host renderer already owns a `VkInstance`/`VkDevice` pair; this
//! adapter wraps those handles in `ash` dispatch tables and builds the
//! device state around them. None of the wrapped handles are ever
//! destroyed from this side.

use core::ffi::{CStr, c_char, c_void};

use anyhow::Context;
use ash::vk;
use parking_lot::Mutex;
use tracing::debug;

use crate::fna3d::{Fna3dDevice, overlay_ref};
use veld::{
    BackendState, DeviceBuilder, GraphicsApiVersion, GraphicsBackend, GraphicsDevice,
    GraphicsDeviceFeatures, IntDashMap,
    vulkan::{
        DebugMarkerFns, SHARED_COMMAND_POOL_COUNT, SharedCommandPool, VulkanDeviceState,
        create_descriptor_pool, create_graphics_command_pool, memory::VkDeviceMemoryManager,
        typed_proc,
    },
};

/// Leading fields of `VulkanRenderer` from FNA3D's Vulkan driver, pinned
/// to the upstream layout. Everything past `unified_queue` is irrelevant
/// here and omitted; the record is only ever read through a reference.
/// <https://github.com/FNA-XNA/FNA3D/blob/master/src/FNA3D_Driver_Vulkan.c>
#[repr(C)]
pub(crate) struct VulkanRenderer {
    pub parent_device: *mut Fna3dDevice,
    pub allocator: *mut c_void,

    pub instance: vk::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub physical_device_properties: vk::PhysicalDeviceProperties2<'static>,
    pub physical_device_driver_properties: vk::PhysicalDeviceDriverProperties<'static>,
    pub logical_device: vk::Device,

    pub queue_family_index: u32,
    pub unified_queue: vk::Queue,
}

/// Build a device around the host's live Vulkan renderer.
///
/// # Safety
/// `driver_data` must point to the host's `VulkanRenderer` record, and the
/// instance and device handles inside it must stay valid for the process
/// lifetime.
#[tracing::instrument]
pub(crate) unsafe fn adopt(driver_data: *mut c_void) -> anyhow::Result<GraphicsDevice> {
    let renderer = unsafe { overlay_ref::<VulkanRenderer>(driver_data) };

    // The host linked its own loader; load ours against the same runtime
    // and rebuild dispatch tables for the host's handles.
    let entry = unsafe { ash::Entry::load() }.context("Vulkan loader unavailable")?;
    let instance = unsafe { ash::Instance::load(entry.static_fn(), renderer.instance) };
    let device = unsafe { ash::Device::load(instance.fp_v1_0(), renderer.logical_device) };
    let physical_device = renderer.physical_device;

    let properties = renderer.physical_device_properties.properties;
    let driver_properties = &renderer.physical_device_driver_properties;
    let device_name = fixed_cstr_to_string(&properties.device_name);
    let driver_name = fixed_cstr_to_string(&driver_properties.driver_name);
    let driver_info = fixed_cstr_to_string(&driver_properties.driver_info);
    debug!(
        device = %device_name,
        driver = %driver_name,
        queue_family_index = renderer.queue_family_index,
        "adopting Vulkan device"
    );

    let physical_device_features =
        unsafe { instance.get_physical_device_features(physical_device) };
    let memory_properties =
        unsafe { instance.get_physical_device_memory_properties(physical_device) };

    let mut device_proc =
        |name: &CStr| unsafe { instance.get_device_proc_addr(device.handle(), name.as_ptr()) };

    let get_buffer_memory_requirements2 = unsafe {
        typed_proc(resolve_with_fallback(
            &mut device_proc,
            c"vkGetBufferMemoryRequirements2",
            c"vkGetBufferMemoryRequirements2KHR",
        ))
    };
    let get_image_memory_requirements2 = unsafe {
        typed_proc(resolve_with_fallback(
            &mut device_proc,
            c"vkGetImageMemoryRequirements2",
            c"vkGetImageMemoryRequirements2KHR",
        ))
    };
    let debug_markers = DebugMarkerFns::resolve(&mut device_proc);

    let memory_manager = VkDeviceMemoryManager::new(
        device.clone(),
        physical_device,
        properties.limits.buffer_image_granularity,
        get_buffer_memory_requirements2,
        get_image_memory_requirements2,
    );

    let graphics_command_pool =
        create_graphics_command_pool(&device, renderer.queue_family_index)
            .context("graphics command pool creation failed")?;
    let descriptor_pool =
        create_descriptor_pool(&device).context("descriptor pool creation failed")?;
    let shared_graphics_command_pools = (0..SHARED_COMMAND_POOL_COUNT)
        .map(|_| SharedCommandPool::new(&device, renderer.queue_family_index, true))
        .collect::<Result<Vec<_>, _>>()
        .context("shared command pool creation failed")?;

    let features = fold_features(&physical_device_features, debug_markers.is_some());
    let api_version =
        api_version_from_conformance(driver_properties.conformance_version);

    let state = VulkanDeviceState {
        entry,
        instance,
        device,
        physical_device,
        queue_family_index: renderer.queue_family_index,
        graphics_queue: renderer.unified_queue,
        physical_device_properties: properties,
        physical_device_features,
        memory_properties,
        driver_name: Some(driver_name),
        get_buffer_memory_requirements2,
        get_image_memory_requirements2,
        debug_markers,
        memory_manager,
        filters: IntDashMap::default(),
        graphics_queue_lock: Mutex::new(()),
        graphics_command_pool,
        descriptor_pool,
        shared_graphics_command_pools: Mutex::new(shared_graphics_command_pools),
        available_staging_buffers: Mutex::new(Vec::new()),
        available_staging_textures: Mutex::new(Vec::new()),
        submitted_staging_buffers: IntDashMap::default(),
        submitted_staging_textures: IntDashMap::default(),
        submitted_shared_command_pools: IntDashMap::default(),
    };

    let adopted = DeviceBuilder::new(GraphicsBackend::Vulkan, BackendState::Vulkan(Box::new(state)))
        .device_name(device_name)
        .vendor_name(format!("id:{:08x}", properties.vendor_id))
        .driver_info(driver_info)
        .api_version(api_version)
        .features(features)
        .finish();
    adopted.post_device_created();

    Ok(adopted)
}

/// Resolve an entry point under its promoted core name, falling back to
/// the KHR alias on pre-promotion runtimes.
fn resolve_with_fallback(
    mut lookup: impl FnMut(&CStr) -> vk::PFN_vkVoidFunction,
    primary: &CStr,
    fallback: &CStr,
) -> vk::PFN_vkVoidFunction {
    lookup(primary).or_else(|| lookup(fallback))
}

fn api_version_from_conformance(version: vk::ConformanceVersion) -> GraphicsApiVersion {
    GraphicsApiVersion::new(
        u32::from(version.major),
        u32::from(version.minor),
        u32::from(version.subminor),
        u32::from(version.patch),
    )
}

fn fixed_cstr_to_string(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Fold the physical device's reported support into the capability record.
fn fold_features(
    features: &vk::PhysicalDeviceFeatures,
    debug_markers: bool,
) -> GraphicsDeviceFeatures {
    let mut folded = GraphicsDeviceFeatures::COMPUTE_SHADER
        | GraphicsDeviceFeatures::SAMPLER_LOD_BIAS
        | GraphicsDeviceFeatures::DRAW_BASE_VERTEX
        | GraphicsDeviceFeatures::DRAW_BASE_INSTANCE
        | GraphicsDeviceFeatures::DRAW_INDIRECT
        | GraphicsDeviceFeatures::TEXTURE1_D
        | GraphicsDeviceFeatures::STRUCTURED_BUFFER
        | GraphicsDeviceFeatures::SUBSET_TEXTURE_VIEW
        | GraphicsDeviceFeatures::BUFFER_RANGE_BINDING;

    let folds = [
        (features.geometry_shader, GraphicsDeviceFeatures::GEOMETRY_SHADER),
        (
            features.tessellation_shader,
            GraphicsDeviceFeatures::TESSELLATION_SHADERS,
        ),
        (features.multi_viewport, GraphicsDeviceFeatures::MULTIPLE_VIEWPORTS),
        (
            features.draw_indirect_first_instance,
            GraphicsDeviceFeatures::DRAW_INDIRECT_BASE_INSTANCE,
        ),
        (
            features.fill_mode_non_solid,
            GraphicsDeviceFeatures::FILL_MODE_WIREFRAME,
        ),
        (
            features.sampler_anisotropy,
            GraphicsDeviceFeatures::SAMPLER_ANISOTROPY,
        ),
        (features.depth_clamp, GraphicsDeviceFeatures::DEPTH_CLIP_DISABLE),
        (
            features.independent_blend,
            GraphicsDeviceFeatures::INDEPENDENT_BLEND,
        ),
        (features.shader_float64, GraphicsDeviceFeatures::SHADER_FLOAT64),
    ];
    for (supported, flag) in folds {
        if supported != vk::FALSE {
            folded |= flag;
        }
    }

    if debug_markers {
        folded |= GraphicsDeviceFeatures::COMMAND_LIST_DEBUG_MARKERS;
    }

    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "system" fn noop() {}

    #[test]
    fn promoted_name_wins_over_khr_alias() {
        let mut queried = Vec::new();
        let resolved = resolve_with_fallback(
            |name| {
                queried.push(name.to_owned());
                Some(noop as unsafe extern "system" fn())
            },
            c"vkGetBufferMemoryRequirements2",
            c"vkGetBufferMemoryRequirements2KHR",
        );

        assert!(resolved.is_some());
        assert_eq!(queried.len(), 1);
        assert_eq!(queried[0].as_c_str(), c"vkGetBufferMemoryRequirements2");
    }

    #[test]
    fn khr_alias_covers_pre_promotion_runtimes() {
        let resolved = resolve_with_fallback(
            |name| {
                (name == c"vkGetImageMemoryRequirements2KHR")
                    .then_some(noop as unsafe extern "system" fn())
            },
            c"vkGetImageMemoryRequirements2",
            c"vkGetImageMemoryRequirements2KHR",
        );
        assert!(resolved.is_some());

        assert!(
            resolve_with_fallback(
                |_| None,
                c"vkGetImageMemoryRequirements2",
                c"vkGetImageMemoryRequirements2KHR",
            )
            .is_none()
        );
    }

    #[test]
    fn optional_capabilities_follow_the_reported_feature_bools() {
        let none = fold_features(&vk::PhysicalDeviceFeatures::default(), false);
        assert!(!none.contains(GraphicsDeviceFeatures::GEOMETRY_SHADER));
        assert!(!none.contains(GraphicsDeviceFeatures::SHADER_FLOAT64));
        assert!(!none.contains(GraphicsDeviceFeatures::COMMAND_LIST_DEBUG_MARKERS));
        // Unconditional capabilities stay on regardless.
        assert!(none.contains(
            GraphicsDeviceFeatures::COMPUTE_SHADER | GraphicsDeviceFeatures::BUFFER_RANGE_BINDING
        ));

        let reported = vk::PhysicalDeviceFeatures {
            geometry_shader: vk::TRUE,
            sampler_anisotropy: vk::TRUE,
            shader_float64: vk::TRUE,
            ..Default::default()
        };
        let folded = fold_features(&reported, true);
        assert!(folded.contains(
            GraphicsDeviceFeatures::GEOMETRY_SHADER
                | GraphicsDeviceFeatures::SAMPLER_ANISOTROPY
                | GraphicsDeviceFeatures::SHADER_FLOAT64
                | GraphicsDeviceFeatures::COMMAND_LIST_DEBUG_MARKERS
        ));
        assert!(!folded.contains(GraphicsDeviceFeatures::TESSELLATION_SHADERS));
    }

    #[test]
    fn conformance_version_maps_straight_through() {
        let version = vk::ConformanceVersion::default()
            .major(1)
            .minor(3)
            .subminor(8)
            .patch(2);
        assert_eq!(
            api_version_from_conformance(version),
            GraphicsApiVersion::new(1, 3, 8, 2)
        );
    }

    #[test]
    fn renderer_record_keeps_handles_at_pinned_offsets() {
        use core::mem;

        let ptr = mem::size_of::<usize>();
        assert_eq!(mem::offset_of!(VulkanRenderer, instance), 2 * ptr);
        assert_eq!(mem::offset_of!(VulkanRenderer, physical_device), 3 * ptr);
        assert_eq!(
            mem::offset_of!(VulkanRenderer, physical_device_properties),
            4 * ptr
        );
    }

    #[test]
    fn fixed_width_strings_are_nul_trimmed() {
        let mut raw = [0 as c_char; 16];
        for (slot, byte) in raw.iter_mut().zip(b"llvmpipe") {
            *slot = *byte as c_char;
        }
        assert_eq!(fixed_cstr_to_string(&raw), "llvmpipe");
        assert_eq!(fixed_cstr_to_string(&[0 as c_char; 4]), "");
    }
}
