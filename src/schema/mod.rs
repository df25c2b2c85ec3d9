//! Shared Memory Block Schema
//!
//! This module owns the byte-level contract between the game's shared
//! memory writer and this crate: fixed-offset block layouts, bounds-checked
//! decoding into typed records, and encoding for the producer simulator.
//!
//! # Architecture
//!
//! The schema system follows a layered approach:
//! - [`layout`] defines block names, sizes and field offsets as constants
//! - [`decode`] turns one raw block copy into owned typed records
//! - [`encode`] writes the same layouts back out for simulation and tests
//!
//! Every block starts with a 16-byte header carrying a layout version and
//! a begin/end write counter pair, so readers can detect both incompatible
//! producers and copies torn mid-write.

pub mod decode;
pub mod encode;
pub mod layout;

pub use decode::{BlockHeader, ScoringBlock, TelemetryBlock};
