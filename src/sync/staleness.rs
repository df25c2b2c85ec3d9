//! Version-counter staleness detection
//!
//! The game bumps a write counter on every block update. When the counter
//! stops advancing the game has exited, crashed or sits on a loading
//! screen; when it moves again the session is live. This module turns the
//! raw counter into one-shot freeze/resume transitions.

use std::time::{Duration, Instant};

/// Edge emitted by [`StalenessDetector::observe`], at most one per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The counter stalled past the threshold; data is stale.
    Frozen,
    /// The counter moved after a freeze; data is live again.
    Resumed,
}

/// Tracks the block version counter across polls.
///
/// Starts frozen, so the first counter movement after startup emits
/// [`Transition::Resumed`]. Counter comparison is plain inequality;
/// a game restart that resets the counter still registers as movement.
#[derive(Debug)]
pub struct StalenessDetector {
    freeze_after: Duration,
    frozen: bool,
    frozen_version: u32,
    last_version: u32,
    last_change: Option<Instant>,
}

impl StalenessDetector {
    pub fn new(freeze_after: Duration) -> Self {
        Self {
            freeze_after,
            frozen: true,
            frozen_version: 0,
            last_version: 0,
            last_change: None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Feeds one observed counter value. `now` is injected so tests can
    /// drive time explicitly.
    pub fn observe(&mut self, version: u32, now: Instant) -> Option<Transition> {
        if version != self.last_version {
            self.last_version = version;
            self.last_change = Some(now);
        }

        if self.frozen {
            if self.frozen_version != self.last_version {
                self.frozen = false;
                return Some(Transition::Resumed);
            }
        } else if let Some(changed) = self.last_change {
            if now.saturating_duration_since(changed) > self.freeze_after {
                self.frozen = true;
                self.frozen_version = self.last_version;
                return Some(Transition::Frozen);
            }
        }

        None
    }

    /// Feeds one poll where no counter could be read at all, as when the
    /// producer region has disappeared. The stall clock keeps running
    /// against the last seen value.
    pub fn observe_stall(&mut self, now: Instant) -> Option<Transition> {
        self.observe(self.last_version, now)
    }
}
