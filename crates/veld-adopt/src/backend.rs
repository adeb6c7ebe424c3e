//! The per-backend adoption adapters.
//!
//! Each adapter overlays the backend-specific renderer record behind
//! `FNA3D_Device.driverData` and builds a [`veld::GraphicsDevice`] around
//! the native handles found there.

pub(crate) mod d3d11;
pub(crate) mod opengl;
pub(crate) mod vulkan;
