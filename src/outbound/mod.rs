//! Delivery of aggregated session data to the pit wall collector
//!
//! # Architecture
//!
//! - **payload** - wire shapes for session announcements, per-tick state
//!   and recorded laps, plus the assembly of a tick payload from an engine
//!   snapshot and the tracker outputs
//! - **collector** - the [`Collector`] trait, the HTTP implementation with
//!   bearer-token login, and an in-memory recording sink for tests
//! - **queue** - bounded submit-and-forget queue decoupling the tick loop
//!   from collector latency
//!
//! The bridge builds payloads on its own cadence and hands them to the
//! queue; nothing in the aggregation path ever waits on the network.

pub mod collector;
pub mod payload;
pub mod queue;

pub use collector::{Collector, Delivered, HttpCollector, RecordingCollector};
pub use payload::{
    LapUpload, PitSummary, RulesSummary, SessionStart, TelemetrySummary, TickPayload, VehicleLine,
    WeatherSummary, WheelLine, build_tick,
};
pub use queue::{Outbound, UploadQueue};
