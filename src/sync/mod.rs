//! Shared Memory Synchronization
//!
//! This module keeps this process in step with the game's shared memory:
//! one background thread polls the blocks, detects freezes through the
//! version counter, resolves the player across the scoring and telemetry
//! arrays and publishes immutable snapshots.
//!
//! # Architecture
//!
//! The sync system follows a layered approach:
//! - [`staleness`] turns the raw version counter into freeze/resume edges
//! - [`locator`] resolves the player and maps ids to telemetry slots
//! - [`engine`] owns the poller thread, cadence control and publication
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pitlink::blocks::InMemoryBlocks;
//! use pitlink::sync::{EngineOptions, SyncEngine};
//!
//! fn main() -> pitlink::Result<()> {
//!     let provider = Arc::new(InMemoryBlocks::new());
//!     let engine = SyncEngine::start(provider, EngineOptions::default())?;
//!
//!     let snapshot = engine.snapshot();
//!     if !engine.is_paused() {
//!         println!("session time: {:.1}s", snapshot.info.current_et);
//!     }
//!
//!     engine.stop()
//! }
//! ```

pub mod engine;
pub mod locator;
pub mod staleness;

pub use engine::{EngineOptions, SyncEngine};
pub use locator::{LocateFailure, PlayerLocator, PlayerSlots};
pub use staleness::{StalenessDetector, Transition};
