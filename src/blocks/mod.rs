//! Shared Memory Block Access
//!
//! This module manages the set of named shared memory regions the game
//! exports and produces consistent byte copies of them for decoding.
//!
//! # Architecture
//!
//! The block system follows a layered approach:
//! - [`provider`] defines the seam between region access and the platform
//! - [`windows`] maps the live game's named regions (Windows only)
//! - [`memory`] backs the same names with heap buffers for simulation
//! - [`BlockSet`] owns one open region per block and the last settled copy
//!
//! Copies are taken with a bounded re-read: a copy whose header write
//! counters disagree was torn mid-write, so the set re-copies a few times
//! and otherwise keeps the previous settled bytes.

pub mod memory;
pub mod provider;

#[cfg(windows)]
pub mod windows;

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::Result;
use crate::schema::layout;
use crate::schema::BlockHeader;

pub use memory::InMemoryBlocks;
pub use provider::{BlockProvider, SharedRegion};
#[cfg(windows)]
pub use windows::WindowsBlocks;

/// Re-copy attempts before keeping the previous settled bytes.
const SETTLE_ATTEMPTS: usize = 3;

/// The shared memory blocks the game exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Scoring,
    Telemetry,
    Extended,
    PitMenu,
    Rules,
    Weather,
}

impl Block {
    pub const ALL: [Block; 6] = [
        Block::Scoring,
        Block::Telemetry,
        Block::Extended,
        Block::PitMenu,
        Block::Rules,
        Block::Weather,
    ];

    pub fn base_name(self) -> &'static str {
        match self {
            Block::Scoring => layout::REGION_SCORING,
            Block::Telemetry => layout::REGION_TELEMETRY,
            Block::Extended => layout::REGION_EXTENDED,
            Block::PitMenu => layout::REGION_PIT_MENU,
            Block::Rules => layout::REGION_RULES,
            Block::Weather => layout::REGION_WEATHER,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Block::Scoring => layout::SCORING_BLOCK_SIZE,
            Block::Telemetry => layout::TELEMETRY_BLOCK_SIZE,
            Block::Extended => layout::EXTENDED_BLOCK_SIZE,
            Block::PitMenu => layout::PIT_BLOCK_SIZE,
            Block::Rules => layout::RULES_BLOCK_SIZE,
            Block::Weather => layout::WEATHER_BLOCK_SIZE,
        }
    }

    /// Scoring and telemetry must be present to attach; the rest degrade
    /// to default state when a game build does not export them.
    pub fn required(self) -> bool {
        matches!(self, Block::Scoring | Block::Telemetry)
    }
}

/// Builds the full region name for a block. Dedicated servers append the
/// producer's process id after the closing marker.
pub fn full_region_name(block: Block, pid: Option<u32>) -> String {
    match pid {
        Some(pid) => format!("{}{}", block.base_name(), pid),
        None => block.base_name().to_string(),
    }
}

struct BlockSlot {
    block: Block,
    name: String,
    region: Option<Box<dyn SharedRegion>>,
    /// Last settled copy, valid when `fresh` is set.
    buf: Vec<u8>,
    scratch: Vec<u8>,
    fresh: bool,
}

impl BlockSlot {
    fn new(block: Block, pid: Option<u32>) -> Self {
        Self {
            block,
            name: full_region_name(block, pid),
            region: None,
            buf: Vec::new(),
            scratch: Vec::new(),
            fresh: false,
        }
    }
}

/// One open region per block plus the last settled copy of each.
///
/// Owned by the poller thread; nothing here is shared. Dropping the set
/// (or calling [`BlockSet::detach`]) closes the underlying regions.
pub struct BlockSet {
    provider: Arc<dyn BlockProvider>,
    slots: Vec<BlockSlot>,
    attached: bool,
}

impl BlockSet {
    pub fn new(provider: Arc<dyn BlockProvider>, pid: Option<u32>) -> Self {
        let slots = Block::ALL.iter().map(|&block| BlockSlot::new(block, pid)).collect();
        Self { provider, slots, attached: false }
    }

    /// Tries to open every region. Fails if a required block is missing;
    /// optional blocks are opened best-effort and retried on later calls.
    pub fn attach(&mut self) -> Result<()> {
        for slot in &mut self.slots {
            if slot.region.is_some() {
                continue;
            }
            match self.provider.open(&slot.name, slot.block.size()) {
                Ok(region) => {
                    debug!(region = %slot.name, provider = self.provider.kind(), "Opened block");
                    slot.region = Some(region);
                }
                Err(err) if slot.block.required() => {
                    self.detach();
                    return Err(err);
                }
                Err(err) => {
                    trace!(region = %slot.name, error = %err, "Optional block unavailable");
                }
            }
        }
        self.attached = true;
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Copies every open region. A read failure on a required block
    /// detaches the whole set and surfaces the error; optional blocks
    /// just lose their region and fall back to default state.
    pub fn refresh(&mut self) -> Result<()> {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            match refresh_slot(slot) {
                Ok(_) => {}
                Err(err) if slot.block.required() => {
                    warn!(region = %slot.name, error = %err, "Required block read failed");
                    self.detach();
                    return Err(err);
                }
                Err(err) => {
                    debug!(region = %slot.name, error = %err, "Optional block read failed");
                    slot.region = None;
                    slot.fresh = false;
                }
            }
        }
        Ok(())
    }

    /// Last settled copy of a block, if the block is open and has been
    /// successfully copied at least once.
    pub fn bytes(&self, block: Block) -> Option<&[u8]> {
        let slot = self.slots.iter().find(|slot| slot.block == block)?;
        slot.fresh.then_some(slot.buf.as_slice())
    }

    /// Closes all regions and forgets buffered copies.
    pub fn detach(&mut self) {
        for slot in &mut self.slots {
            slot.region = None;
            slot.fresh = false;
        }
        self.attached = false;
    }
}

fn refresh_slot(slot: &mut BlockSlot) -> Result<()> {
    let Some(region) = slot.region.as_mut() else {
        return Ok(());
    };

    for _ in 0..SETTLE_ATTEMPTS {
        region.snapshot_into(&mut slot.scratch)?;
        let header = BlockHeader::decode(&slot.scratch)?;
        if header.is_settled() {
            std::mem::swap(&mut slot.buf, &mut slot.scratch);
            slot.fresh = true;
            return Ok(());
        }
    }

    trace!(region = %slot.name, "Block stayed torn, keeping previous copy");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{decode, encode};
    use crate::types::{ScoringInfo, WeatherState};

    fn provider_with_required(blocks: &InMemoryBlocks, version: u32) {
        blocks.publish(
            layout::REGION_SCORING,
            encode::encode_scoring(version, &ScoringInfo::default(), &[]),
        );
        blocks.publish(layout::REGION_TELEMETRY, encode::encode_telemetry(version, &[]));
    }

    #[test]
    fn attach_requires_scoring_and_telemetry() {
        let blocks = InMemoryBlocks::new();
        let mut set = BlockSet::new(Arc::new(blocks.clone()), None);
        assert!(set.attach().is_err());
        assert!(!set.is_attached());

        provider_with_required(&blocks, 1);
        set.attach().unwrap();
        assert!(set.is_attached());
        assert!(set.bytes(Block::Scoring).is_none());

        set.refresh().unwrap();
        assert!(set.bytes(Block::Scoring).is_some());
        assert!(set.bytes(Block::Weather).is_none());
    }

    #[test]
    fn optional_blocks_join_on_later_attach() {
        let blocks = InMemoryBlocks::new();
        provider_with_required(&blocks, 1);

        let mut set = BlockSet::new(Arc::new(blocks.clone()), None);
        set.attach().unwrap();
        set.refresh().unwrap();
        assert!(set.bytes(Block::Weather).is_none());

        blocks.publish(
            layout::REGION_WEATHER,
            encode::encode_weather(1, &WeatherState { ambient_temp: 18.0, ..Default::default() }),
        );
        set.attach().unwrap();
        set.refresh().unwrap();

        let weather = decode::decode_weather(set.bytes(Block::Weather).unwrap()).unwrap();
        assert_eq!(weather.ambient_temp, 18.0);
    }

    #[test]
    fn torn_copy_keeps_previous_settled_bytes() {
        let blocks = InMemoryBlocks::new();
        provider_with_required(&blocks, 7);

        let mut set = BlockSet::new(Arc::new(blocks.clone()), None);
        set.attach().unwrap();
        set.refresh().unwrap();

        let mut torn = encode::encode_telemetry(8, &[]);
        torn[layout::HDR_VERSION_BEGIN..layout::HDR_VERSION_BEGIN + 4]
            .copy_from_slice(&9u32.to_le_bytes());
        blocks.publish(layout::REGION_TELEMETRY, torn);

        set.refresh().unwrap();
        let header = BlockHeader::decode(set.bytes(Block::Telemetry).unwrap()).unwrap();
        assert_eq!(header.version_end, 7);
    }

    #[test]
    fn producer_exit_detaches_the_set() {
        let blocks = InMemoryBlocks::new();
        provider_with_required(&blocks, 1);

        let mut set = BlockSet::new(Arc::new(blocks.clone()), None);
        set.attach().unwrap();
        set.refresh().unwrap();

        blocks.remove(layout::REGION_SCORING);
        assert!(set.refresh().is_err());
        assert!(!set.is_attached());
        assert!(set.bytes(Block::Scoring).is_none());
    }

    #[test]
    fn dedicated_server_names_carry_the_pid() {
        assert_eq!(
            full_region_name(Block::Scoring, Some(4312)),
            format!("{}4312", layout::REGION_SCORING)
        );
        assert_eq!(full_region_name(Block::Rules, None), layout::REGION_RULES);
    }
}
