//! Shared-memory synchronization and telemetry aggregation bridge for
//! rFactor 2 and Le Mans Ultimate.
//!
//! Pitlink reads the six shared memory blocks the game's producer plugin
//! exports, keeps a consistent synchronized snapshot of them, aggregates
//! per-session racing state (fuel and virtual energy consumption, pit
//! stints, recorded laps, session identity) and delivers it to a pit wall
//! collector over HTTP.
//!
//! # Features
//!
//! - **Torn-write safe capture**: begin/end write counters gate every copy
//! - **Stable identity**: all per-vehicle state keys on VehicleID, never on
//!   a slot index
//! - **Staleness detection**: frozen session data pauses aggregation and
//!   drops to a slow poll cadence
//! - **Fire-and-forget delivery**: a bounded queue decouples aggregation
//!   from collector latency
//! - **Scripted producer**: the full engine runs against an in-memory
//!   provider on any platform
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pitlink::{Bridge, BridgeConfig};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> pitlink::Result<()> {
//!     let config = BridgeConfig::from_file("pitlink.yaml")?;
//!     let bridge = Bridge::start(config)?;
//!
//!     let mut statuses = bridge.status_stream();
//!     while let Some(status) = statuses.next().await {
//!         println!("bridge: {}", status.as_str());
//!     }
//!     bridge.stop().await
//! }
//! ```
//!
//! Without the game, drive the same bridge from a scripted producer:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pitlink::sim::{SimOptions, SimProducer};
//! use pitlink::{Bridge, BridgeConfig};
//!
//! # fn collector() -> Arc<dyn pitlink::Collector> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> pitlink::Result<()> {
//!     let mut producer = SimProducer::new(SimOptions::default());
//!     let config = BridgeConfig::from_file("pitlink.yaml")?;
//!     let bridge = Bridge::start_with(config, Arc::new(producer.blocks()), collector())?;
//!
//!     loop {
//!         producer.advance(0.05);
//!         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!         if bridge.status() == pitlink::BridgeStatus::Live {
//!             break;
//!         }
//!     }
//!     bridge.stop().await
//! }
//! ```

// Core types and error handling
mod config;
mod error;
pub mod types;

// Block capture and decoding
pub mod blocks;
pub mod schema;

// Synchronization engine and aggregation
pub mod bridge;
pub mod sync;
pub mod trackers;

// Delivery and simulation
pub mod outbound;
pub mod sim;

// Core exports
pub use config::{BridgeConfig, CollectorConfig, normalize_team_id};
pub use error::{BridgeError, Result};
pub use types::*;

// Capture exports
pub use blocks::{Block, BlockProvider, BlockSet, InMemoryBlocks};
#[cfg(windows)]
pub use blocks::WindowsBlocks;

// Engine exports
pub use sync::{EngineOptions, SyncEngine};

// Bridge exports
pub use bridge::{Bridge, BridgeStatus};
pub use outbound::{Collector, HttpCollector, UploadQueue};
