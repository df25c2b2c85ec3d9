//! Live mapped regions on Windows
//!
//! Maps the game's named shared memory regions read-only, following the
//! same direct-access pattern as the plugin's own C++ clients. There is no
//! data-valid event to wait on; the sync engine polls on its own cadence
//! and tear detection happens on the copied bytes.

use std::ptr::NonNull;

use tracing::{debug, trace};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::core::PCWSTR;

use crate::Result;
use crate::blocks::provider::{BlockProvider, SharedRegion};
use crate::error::BridgeError;

/// Opens the game's named file mappings.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBlocks;

impl WindowsBlocks {
    pub fn new() -> Self {
        Self
    }
}

impl BlockProvider for WindowsBlocks {
    fn open(&self, name: &str, size: usize) -> Result<Box<dyn SharedRegion>> {
        trace!(region = name, "Opening shared memory region");

        let mapping = unsafe {
            let wide_name = wide_string(name);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| BridgeError::region_unavailable_with_source(name, Box::new(e)))?
        };

        let base = unsafe {
            let ptr = MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, size);
            match NonNull::new(ptr.Value as *mut u8) {
                Some(base) => base,
                None => {
                    let win_err = windows::core::Error::from_thread();
                    let _ = CloseHandle(mapping);
                    return Err(BridgeError::windows_api_error("MapViewOfFile", win_err));
                }
            }
        };

        debug!(region = name, size, "Mapped shared memory region");
        Ok(Box::new(MappedRegion { mapping, base, size, name: name.to_string() }))
    }

    fn kind(&self) -> &'static str {
        "windows"
    }
}

/// One mapped view of a game region.
struct MappedRegion {
    mapping: HANDLE,
    base: NonNull<u8>,
    size: usize,
    name: String,
}

impl SharedRegion for MappedRegion {
    fn snapshot_into(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        trace!(region = %self.name, size = self.size, "Copying region bytes");
        buf.clear();
        // SAFETY: base points at a live read-only view mapped with at least
        // `size` bytes; the view stays valid until Drop unmaps it
        unsafe {
            let view = std::slice::from_raw_parts(self.base.as_ptr(), self.size);
            buf.extend_from_slice(view);
        }
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.mapping);
        }
    }
}

// SAFETY: The region only holds a mapping handle and a read-only view
// pointer, both valid from whichever single thread owns the box
unsafe impl Send for MappedRegion {}

/// Convert string to null-terminated wide string for Windows APIs
fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;
    use crate::schema::layout;

    #[test]
    fn opening_a_missing_region_fails_retryably() {
        let provider = WindowsBlocks::new();
        let err = provider.open("$rFactor2SMMP_DoesNotExist$", 64).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    #[ignore = "game_required"]
    fn maps_live_scoring_region() {
        let provider = WindowsBlocks::new();
        let mut region = provider
            .open(layout::REGION_SCORING, layout::SCORING_BLOCK_SIZE)
            .expect("game must be running with the shared memory plugin");

        let mut buf = Vec::new();
        region.snapshot_into(&mut buf).expect("copy failed");
        assert_eq!(buf.len(), layout::SCORING_BLOCK_SIZE);
    }
}
