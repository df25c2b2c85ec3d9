//! Telemetry Aggregation Trackers
//!
//! This module holds the per-tick aggregation state machines fed from
//! engine snapshots by the bridge loop.
//!
//! # Architecture
//!
//! Each tracker is a plain synchronous state machine owned by the
//! aggregation loop, one concern apiece:
//! - [`consumption`] folds lap-boundary fuel and virtual-energy deltas
//! - [`stint`] tracks pit stops and stint length for the whole field
//! - [`recorder`] buffers distance-keyed samples for lap uploads
//! - [`session`] detects session transitions and mints history ids
//!
//! All of them expose `reset()`; the bridge invalidates them together
//! when the session classifier reports a transition.

pub mod consumption;
pub mod recorder;
pub mod session;
pub mod stint;

pub use consumption::{ConsumptionStats, ConsumptionTracker};
pub use recorder::{CompletedLap, LapSample, LapSampleRecorder, RecorderOptions};
pub use session::SessionClassifier;
pub use stint::{StintReport, StintState, VehicleStintTracker};
