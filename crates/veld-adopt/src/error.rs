use thiserror::Error;

/// Failure modes of device adoption.
///
/// A third failure class exists that cannot be reported: if the host's
/// internal renderer layout drifts from the pinned record shapes in this
/// crate, reads through the overlays return garbage handles and the native
/// runtime misbehaves downstream. Keep the records in sync with the FNA3D
/// revision the host ships.
#[derive(Debug, Error)]
pub enum AdoptError {
    /// The host has not finished creating its graphics device. Adoption can
    /// be retried once the host is fully initialized.
    #[error("host graphics device is not ready")]
    DeviceNotReady,

    /// The host renderer reports a backend this crate has no adapter for.
    /// Fatal; there is nothing meaningful to construct.
    #[error("unsupported FNA3D renderer type {0}")]
    UnsupportedBackend(i32),

    /// A native query failed while an adapter was building the device.
    #[error(transparent)]
    Adoption(#[from] anyhow::Error),
}
