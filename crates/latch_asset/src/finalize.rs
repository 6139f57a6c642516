//! Main-thread completion of decoded payloads.

use crate::{AssetError, AssetPayload, AssetRecord};

/// Turns a decoded payload into its final form on the main thread.
///
/// Runs with exclusive access, so implementations may own non-thread-safe
/// state such as a graphics context.
pub trait Finalizer {
    fn finalize(
        &mut self,
        record: &AssetRecord,
        payload: AssetPayload,
    ) -> Result<AssetPayload, AssetError>;
}

/// Installs payloads unchanged. Used when the host has no GPU work to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFinalizer;

impl Finalizer for PassThroughFinalizer {
    fn finalize(
        &mut self,
        _record: &AssetRecord,
        payload: AssetPayload,
    ) -> Result<AssetPayload, AssetError> {
        Ok(payload)
    }
}

impl<F> Finalizer for F
where
    F: FnMut(&AssetRecord, AssetPayload) -> Result<AssetPayload, AssetError>,
{
    fn finalize(
        &mut self,
        record: &AssetRecord,
        payload: AssetPayload,
    ) -> Result<AssetPayload, AssetError> {
        self(record, payload)
    }
}
