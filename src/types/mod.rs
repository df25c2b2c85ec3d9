//! Core types for decoded producer state.
//!
//! This module provides the data structures the rest of the crate works on:
//! owned copies of the records decoded out of the producer's shared memory
//! regions, and the aggregate snapshot the sync engine publishes to readers.
//!
//! ## Architecture
//!
//! - [`ScoringInfo`] and [`VehicleScoring`] mirror the scoring block: one
//!   session summary plus up to 128 vehicle records per poll
//! - [`VehicleTelemetry`] mirrors one slot of the telemetry block
//! - [`ExtendedState`], [`PitMenuState`], [`TrackRulesState`] and
//!   [`WeatherState`] mirror the four auxiliary blocks
//! - [`VehicleId`] is the stable identity every per-vehicle structure keys on
//! - [`EngineSnapshot`] bundles one poll's decoded state behind an `Arc`
//!
//! Nothing here borrows from shared memory; records are plain owned values
//! and a reader can never observe one mid-overwrite.
//!
//! ## Usage Example
//!
//! ```rust
//! use pitlink::types::{EngineSnapshot, VehicleId, VehicleScoring};
//!
//! let snapshot = EngineSnapshot {
//!     vehicles: vec![VehicleScoring {
//!         id: VehicleId(14),
//!         place: 1,
//!         driver_name: "A. Driver".to_string(),
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! assert_eq!(snapshot.leader().map(|v| v.id), Some(VehicleId(14)));
//! assert!(snapshot.vehicle_by_id(VehicleId(99)).is_none());
//! ```

mod extras;
mod ids;
mod scoring;
mod session;
mod snapshot;
mod telemetry;

// Re-export all public types
pub use extras::{ExtendedState, PitMenuState, RulesParticipant, TrackRulesState, WeatherState};
pub use ids::VehicleId;
pub use scoring::{ControlSource, FinishStatus, ScoringInfo, SimKind, VehicleScoring};
pub use session::{SessionContext, SessionPhase};
pub use snapshot::EngineSnapshot;
pub use telemetry::{VehicleTelemetry, WheelTelemetry};
