//! Direct3D11 adoption adapter.

use core::ffi::c_void;

use veld::{GraphicsApiVersion, GraphicsDeviceFeatures};

use crate::fna3d::Fna3dDevice;

// D3D_FEATURE_LEVEL values as reported by the native device.
const FEATURE_LEVEL_10_0: i32 = 0xa000;
const FEATURE_LEVEL_10_1: i32 = 0xa100;
const FEATURE_LEVEL_11_0: i32 = 0xb000;
const FEATURE_LEVEL_11_1: i32 = 0xb100;
const FEATURE_LEVEL_12_0: i32 = 0xc000;
const FEATURE_LEVEL_12_1: i32 = 0xc100;
const FEATURE_LEVEL_12_2: i32 = 0xc200;

/// `D3D11Renderer` from FNA3D's D3D11 driver, pinned to the upstream
/// layout. Only the leading handle fields are read; the rest keep the
/// record shape honest.
/// <https://github.com/FNA-XNA/FNA3D/blob/master/src/FNA3D_Driver_D3D11.c>
#[repr(C)]
pub(crate) struct D3d11Renderer {
    /// `ID3D11Device*`
    pub device: *mut c_void,
    /// `ID3D11DeviceContext*`
    pub context: *mut c_void,
    pub d3d11_dll: *mut c_void,
    pub dxgi_dll: *mut c_void,
    /// `IDXGIFactory1*` or `IDXGIFactory2*`
    pub factory: *mut c_void,
    /// `IDXGIAdapter*`
    pub adapter: *mut c_void,
    /// `ID3D11UserDefinedAnnotation*`
    pub annotation: *mut c_void,
    pub supports_tearing: u8,
    /// SDL mutex guarding the context
    pub ctx_lock: *mut c_void,
    pub iconv: *mut c_void,

    // window surfaces
    pub swapchain_datas: *mut c_void,
    pub swapchain_data_count: i32,
    pub swapchain_data_capacity: i32,

    // faux backbuffer
    pub backbuffer: *mut c_void,
    pub backbuffer_size_changed: u8,
    pub prev_src_rect: [i32; 4],
    pub prev_dst_rect: [i32; 4],
    pub faux_backbuffer_resources: [*mut c_void; 8],

    // capabilities
    pub debug_mode: u8,
    pub supports_dxt1: i32,
    pub supports_s3tc: i32,
    pub supports_bc7: i32,
    pub supports_srgb_render_target: u8,
    pub max_multi_sample_count: i32,

    pub sync_interval: u8,

    pub blend_state: *mut c_void,
    pub blend_factor: u32,

    pub parent_device: *mut Fna3dDevice,
}

/// Map a feature level to the API version the device reports.
///
/// Unrecognized levels report [`GraphicsApiVersion::UNKNOWN`] instead of
/// failing; only version display is affected.
fn api_version_from_feature_level(feature_level: i32) -> GraphicsApiVersion {
    match feature_level {
        FEATURE_LEVEL_10_0 => GraphicsApiVersion::new(10, 0, 0, 0),
        FEATURE_LEVEL_10_1 => GraphicsApiVersion::new(10, 1, 0, 0),
        FEATURE_LEVEL_11_0 => GraphicsApiVersion::new(11, 0, 0, 0),
        FEATURE_LEVEL_11_1 => GraphicsApiVersion::new(11, 1, 0, 0),
        FEATURE_LEVEL_12_0 => GraphicsApiVersion::new(12, 0, 0, 0),
        FEATURE_LEVEL_12_1 => GraphicsApiVersion::new(12, 1, 0, 0),
        FEATURE_LEVEL_12_2 => GraphicsApiVersion::new(12, 2, 0, 0),
        _ => GraphicsApiVersion::UNKNOWN,
    }
}

/// Capabilities guaranteed at the minimum feature level this adapter
/// accepts, before the level- and query-dependent flags are folded in.
fn baseline_features() -> GraphicsDeviceFeatures {
    GraphicsDeviceFeatures::COMPUTE_SHADER
        | GraphicsDeviceFeatures::GEOMETRY_SHADER
        | GraphicsDeviceFeatures::TESSELLATION_SHADERS
        | GraphicsDeviceFeatures::MULTIPLE_VIEWPORTS
        | GraphicsDeviceFeatures::SAMPLER_LOD_BIAS
        | GraphicsDeviceFeatures::DRAW_BASE_VERTEX
        | GraphicsDeviceFeatures::DRAW_BASE_INSTANCE
        | GraphicsDeviceFeatures::DRAW_INDIRECT
        | GraphicsDeviceFeatures::DRAW_INDIRECT_BASE_INSTANCE
        | GraphicsDeviceFeatures::FILL_MODE_WIREFRAME
        | GraphicsDeviceFeatures::SAMPLER_ANISOTROPY
        | GraphicsDeviceFeatures::DEPTH_CLIP_DISABLE
        | GraphicsDeviceFeatures::TEXTURE1_D
        | GraphicsDeviceFeatures::INDEPENDENT_BLEND
        | GraphicsDeviceFeatures::STRUCTURED_BUFFER
        | GraphicsDeviceFeatures::SUBSET_TEXTURE_VIEW
}

/// Fold the native device's reported support into the capability record.
fn fold_features(feature_level: i32, shader_float64: bool) -> GraphicsDeviceFeatures {
    let mut features = baseline_features();
    if feature_level >= FEATURE_LEVEL_11_1 {
        features |= GraphicsDeviceFeatures::COMMAND_LIST_DEBUG_MARKERS
            | GraphicsDeviceFeatures::BUFFER_RANGE_BINDING;
    }
    if shader_float64 {
        features |= GraphicsDeviceFeatures::SHADER_FLOAT64;
    }
    features
}

fn utf16_to_string(raw: &[u16]) -> String {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}

#[cfg(windows)]
mod adapt {
    use core::ffi::c_void;
    use core::mem;
    use std::collections::HashMap;

    use anyhow::Context;
    use parking_lot::Mutex;
    use tracing::debug;
    use windows::{
        Win32::Graphics::{
            Direct3D11::{
                D3D11_CREATE_DEVICE_DEBUG, D3D11_FEATURE_DATA_DOUBLES,
                D3D11_FEATURE_DATA_THREADING, D3D11_FEATURE_DOUBLES, D3D11_FEATURE_THREADING,
                ID3D11Device, ID3D11DeviceContext,
            },
            Dxgi::IDXGIAdapter,
        },
        core::Interface,
    };

    use super::*;
    use crate::fna3d::overlay_ref;
    use veld::{BackendState, DeviceBuilder, GraphicsBackend, GraphicsDevice, d3d11::D3d11DeviceState};

    /// Build a device around the host's live D3D11 renderer.
    ///
    /// # Safety
    /// `driver_data` must point to the host's `D3D11Renderer` record and
    /// stay valid for the process lifetime.
    #[tracing::instrument]
    pub(crate) unsafe fn adopt(driver_data: *mut c_void) -> anyhow::Result<GraphicsDevice> {
        let renderer = unsafe { overlay_ref::<D3d11Renderer>(driver_data) };

        // Borrow the host's COM pointers, then take our own references so
        // the adopted device is safe against anything but the host tearing
        // the whole device down.
        let device = unsafe { ID3D11Device::from_raw_borrowed(&renderer.device) }
            .context("host D3D11 device handle is null")?
            .clone();
        let immediate_context =
            unsafe { ID3D11DeviceContext::from_raw_borrowed(&renderer.context) }
                .context("host D3D11 immediate context handle is null")?
                .clone();
        let dxgi_adapter = unsafe { IDXGIAdapter::from_raw_borrowed(&renderer.adapter) }
            .context("host DXGI adapter handle is null")?
            .clone();

        let desc = unsafe { dxgi_adapter.GetDesc() }.context("adapter description query failed")?;
        let device_name = utf16_to_string(&desc.Description);
        let vendor_name = format!("id:{:08x}", desc.VendorId);

        let feature_level = unsafe { device.GetFeatureLevel() }.0;
        let (supports_concurrent_resources, supports_command_lists) =
            check_threading_support(&device);
        let shader_float64 = check_doubles_support(&device);
        let is_debug_enabled =
            unsafe { device.GetCreationFlags() } & D3D11_CREATE_DEVICE_DEBUG.0 as u32 != 0;
        debug!(
            device = %device_name,
            feature_level = format_args!("{feature_level:#x}"),
            supports_command_lists,
            "adopting D3D11 device"
        );

        let state = D3d11DeviceState {
            device,
            immediate_context,
            dxgi_adapter,
            device_id: desc.DeviceId,
            supports_concurrent_resources,
            supports_command_lists,
            is_debug_enabled,
            immediate_context_lock: Mutex::new(()),
            mapped_resources: Mutex::new(HashMap::new()),
            available_staging_buffers: Mutex::new(Vec::new()),
            reset_events: Mutex::new(Vec::new()),
        };

        let adopted = DeviceBuilder::new(GraphicsBackend::Direct3D11, BackendState::D3d11(state))
            .device_name(device_name)
            .vendor_name(vendor_name)
            .api_version(api_version_from_feature_level(feature_level))
            .features(fold_features(feature_level, shader_float64))
            .finish();
        adopted.post_device_created();

        Ok(adopted)
    }

    fn check_threading_support(device: &ID3D11Device) -> (bool, bool) {
        let mut threading = D3D11_FEATURE_DATA_THREADING::default();
        let supported = unsafe {
            device.CheckFeatureSupport(
                D3D11_FEATURE_THREADING,
                &mut threading as *mut _ as *mut c_void,
                mem::size_of::<D3D11_FEATURE_DATA_THREADING>() as u32,
            )
        }
        .is_ok();

        if supported {
            (
                threading.DriverConcurrentCreates.as_bool(),
                threading.DriverCommandLists.as_bool(),
            )
        } else {
            (false, false)
        }
    }

    fn check_doubles_support(device: &ID3D11Device) -> bool {
        let mut doubles = D3D11_FEATURE_DATA_DOUBLES::default();
        unsafe {
            device.CheckFeatureSupport(
                D3D11_FEATURE_DOUBLES,
                &mut doubles as *mut _ as *mut c_void,
                mem::size_of::<D3D11_FEATURE_DATA_DOUBLES>() as u32,
            )
        }
        .is_ok()
            && doubles.DoublePrecisionFloatShaderOps.as_bool()
    }
}

#[cfg(windows)]
pub(crate) use adapt::adopt;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_levels_map_to_documented_version_tuples() {
        let expected = [
            (FEATURE_LEVEL_10_0, (10, 0)),
            (FEATURE_LEVEL_10_1, (10, 1)),
            (FEATURE_LEVEL_11_0, (11, 0)),
            (FEATURE_LEVEL_11_1, (11, 1)),
            (FEATURE_LEVEL_12_0, (12, 0)),
            (FEATURE_LEVEL_12_1, (12, 1)),
            (FEATURE_LEVEL_12_2, (12, 2)),
        ];
        for (level, (major, minor)) in expected {
            assert_eq!(
                api_version_from_feature_level(level),
                GraphicsApiVersion::new(major, minor, 0, 0),
            );
        }
    }

    #[test]
    fn unrecognized_feature_level_yields_unknown_version() {
        // 9.x levels exist natively but are below what adoption supports.
        assert_eq!(
            api_version_from_feature_level(0x9300),
            GraphicsApiVersion::UNKNOWN
        );
        assert_eq!(api_version_from_feature_level(0), GraphicsApiVersion::UNKNOWN);
    }

    #[test]
    fn marker_and_range_binding_capabilities_gate_on_11_1() {
        let gated = GraphicsDeviceFeatures::COMMAND_LIST_DEBUG_MARKERS
            | GraphicsDeviceFeatures::BUFFER_RANGE_BINDING;

        for level in [FEATURE_LEVEL_10_0, FEATURE_LEVEL_10_1, FEATURE_LEVEL_11_0] {
            assert!(!fold_features(level, false).intersects(gated));
        }
        for level in [
            FEATURE_LEVEL_11_1,
            FEATURE_LEVEL_12_0,
            FEATURE_LEVEL_12_1,
            FEATURE_LEVEL_12_2,
        ] {
            assert!(fold_features(level, false).contains(gated));
        }
    }

    #[test]
    fn shader_float64_follows_the_doubles_query() {
        assert!(
            fold_features(FEATURE_LEVEL_11_0, true)
                .contains(GraphicsDeviceFeatures::SHADER_FLOAT64)
        );
        assert!(
            !fold_features(FEATURE_LEVEL_11_0, false)
                .contains(GraphicsDeviceFeatures::SHADER_FLOAT64)
        );
    }

    #[test]
    fn baseline_capabilities_are_always_present() {
        let features = fold_features(FEATURE_LEVEL_10_0, false);
        assert!(features.contains(
            GraphicsDeviceFeatures::COMPUTE_SHADER
                | GraphicsDeviceFeatures::GEOMETRY_SHADER
                | GraphicsDeviceFeatures::TESSELLATION_SHADERS
                | GraphicsDeviceFeatures::DRAW_INDIRECT
                | GraphicsDeviceFeatures::SAMPLER_ANISOTROPY
        ));
    }

    #[test]
    fn renderer_record_keeps_handles_at_pinned_offsets() {
        use core::mem;

        assert_eq!(mem::offset_of!(D3d11Renderer, device), 0);
        assert_eq!(
            mem::offset_of!(D3d11Renderer, context),
            mem::size_of::<usize>()
        );
        assert_eq!(
            mem::offset_of!(D3d11Renderer, adapter),
            5 * mem::size_of::<usize>()
        );
    }

    #[test]
    fn adapter_descriptions_are_nul_trimmed() {
        let mut raw = [0u16; 8];
        for (i, c) in "GPU".encode_utf16().enumerate() {
            raw[i] = c;
        }
        assert_eq!(utf16_to_string(&raw), "GPU");
        assert_eq!(utf16_to_string(&[0u16; 4]), "");
    }
}
