//! Provider traits for shared memory regions
//!
//! Providers abstract over where block bytes come from (a live game's
//! named mappings, or in-process buffers for simulation and tests) so the
//! sync engine never touches platform APIs directly.

use crate::Result;

/// One open shared memory region.
///
/// Implementations copy the region contents on demand; the poller thread
/// owns the region and is the only caller, so `&mut self` is enough.
pub trait SharedRegion: Send {
    /// Copies the current region contents into `buf`, replacing whatever
    /// was there. The copy is raw bytes; tear detection happens on the
    /// copy, not the region.
    fn snapshot_into(&mut self, buf: &mut Vec<u8>) -> Result<()>;
}

impl std::fmt::Debug for dyn SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedRegion")
    }
}

/// Factory for shared memory regions.
///
/// `open` is called with the full region name (prefix, block name and any
/// process id suffix already applied) and the expected byte size.
///
/// Returns:
/// - `Ok(region)` - Region exists and is mapped
/// - `Err(e)` - Region unavailable; the caller retries on its slow cadence
pub trait BlockProvider: Send + Sync + 'static {
    fn open(&self, name: &str, size: usize) -> Result<Box<dyn SharedRegion>>;

    /// Short identifier for logs ("windows", "memory").
    fn kind(&self) -> &'static str;
}
