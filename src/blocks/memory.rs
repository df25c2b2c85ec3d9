//! In-process block provider
//!
//! Backs the same region names with plain heap buffers so the full engine
//! and bridge stack can run without a game on any platform. The producer
//! simulator publishes into this provider; tests drive it directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::blocks::provider::{BlockProvider, SharedRegion};
use crate::error::BridgeError;
use crate::Result;

type RegionMap = HashMap<String, Vec<u8>>;

/// Clonable handle to a shared set of named byte buffers.
#[derive(Clone, Default)]
pub struct InMemoryBlocks {
    regions: Arc<Mutex<RegionMap>>,
}

impl InMemoryBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a region with the given bytes. Publishing is
    /// atomic from the reader's point of view; a snapshot sees either the
    /// old bytes or the new ones.
    pub fn publish(&self, name: &str, bytes: Vec<u8>) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.insert(name.to_string(), bytes);
    }

    /// Removes a region, as if the producer process exited. Open handles
    /// start failing on their next snapshot.
    pub fn remove(&self, name: &str) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.remove(name);
    }

    /// Removes every region.
    pub fn clear(&self) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.contains_key(name)
    }

    /// Copy of a region's current bytes.
    pub fn bytes(&self, name: &str) -> Option<Vec<u8>> {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.get(name).cloned()
    }
}

impl std::fmt::Debug for InMemoryBlocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InMemoryBlocks").field("regions", &regions.keys()).finish()
    }
}

impl BlockProvider for InMemoryBlocks {
    fn open(&self, name: &str, _size: usize) -> Result<Box<dyn SharedRegion>> {
        if !self.contains(name) {
            return Err(BridgeError::region_unavailable(name));
        }
        Ok(Box::new(MemoryRegion {
            regions: Arc::clone(&self.regions),
            name: name.to_string(),
        }))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

struct MemoryRegion {
    regions: Arc<Mutex<RegionMap>>,
    name: String,
}

impl SharedRegion for MemoryRegion {
    fn snapshot_into(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = regions
            .get(&self.name)
            .ok_or_else(|| BridgeError::region_unavailable(&self.name))?;
        buf.clear();
        buf.extend_from_slice(bytes);
        Ok(())
    }
}
