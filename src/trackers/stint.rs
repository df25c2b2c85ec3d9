//! Per-vehicle pit and stint tracking
//!
//! Keeps one small state record per vehicle id for the whole field and
//! derives stint length (laps since the last pit exit) fresh on every
//! tick. Pit stops are detected locally from the in-pits flag edge and
//! reconciled against the producer's own counter, which can run ahead
//! when a stop happened before this process attached.

use std::collections::HashMap;

use tracing::trace;

use crate::types::VehicleId;

/// Persistent per-vehicle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StintState {
    pub was_in_pits: bool,
    pub last_pit_lap: u32,
    pub pit_count: u32,
}

/// Derived figures for one vehicle on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StintReport {
    pub pit_count: u32,
    pub stint_laps: u32,
}

/// Field-wide tracker keyed by vehicle id, never by slot index.
#[derive(Debug, Default)]
pub struct VehicleStintTracker {
    vehicles: HashMap<VehicleId, StintState>,
}

impl VehicleStintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one vehicle's scoring state for this tick.
    pub fn update(
        &mut self,
        id: VehicleId,
        laps: u32,
        in_pits: bool,
        reported_pit_count: u32,
    ) -> StintReport {
        let state = self.vehicles.entry(id).or_insert_with(|| StintState {
            was_in_pits: in_pits,
            last_pit_lap: laps,
            pit_count: reported_pit_count,
        });

        if in_pits && !state.was_in_pits {
            state.pit_count += 1;
            trace!(id = %id, pit_count = state.pit_count, "pit entry");
        }
        if !in_pits && state.was_in_pits {
            state.last_pit_lap = laps;
            trace!(id = %id, lap = laps, "pit exit, stint restarts");
        }
        state.was_in_pits = in_pits;

        if reported_pit_count > state.pit_count {
            state.pit_count = reported_pit_count;
        }
        if state.last_pit_lap > laps {
            state.last_pit_lap = 0;
        }

        StintReport {
            pit_count: state.pit_count,
            stint_laps: laps.saturating_sub(state.last_pit_lap),
        }
    }

    pub fn tracked(&self) -> usize {
        self.vehicles.len()
    }

    /// Drops every vehicle's state. Used on session transitions.
    pub fn reset(&mut self) {
        self.vehicles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: VehicleId = VehicleId(21);

    #[test]
    fn stint_grows_from_first_sighting() {
        let mut tracker = VehicleStintTracker::new();
        assert_eq!(tracker.update(CAR, 3, false, 0).stint_laps, 0);
        assert_eq!(tracker.update(CAR, 4, false, 0).stint_laps, 1);
        assert_eq!(tracker.update(CAR, 7, false, 0).stint_laps, 4);
    }

    #[test]
    fn pit_entry_counts_once_per_visit() {
        let mut tracker = VehicleStintTracker::new();
        tracker.update(CAR, 5, false, 0);

        assert_eq!(tracker.update(CAR, 6, true, 0).pit_count, 1);
        // Sitting in the pit lane over several ticks is still one stop.
        assert_eq!(tracker.update(CAR, 6, true, 0).pit_count, 1);
        assert_eq!(tracker.update(CAR, 6, false, 0).pit_count, 1);
        assert_eq!(tracker.update(CAR, 10, true, 0).pit_count, 2);
    }

    #[test]
    fn pit_exit_resets_stint_immediately() {
        let mut tracker = VehicleStintTracker::new();
        tracker.update(CAR, 2, false, 0);
        tracker.update(CAR, 8, true, 0);

        let report = tracker.update(CAR, 8, false, 0);
        assert_eq!(report.stint_laps, 0);
        assert_eq!(tracker.update(CAR, 11, false, 0).stint_laps, 3);
    }

    #[test]
    fn producer_counter_is_adopted_only_when_larger() {
        let mut tracker = VehicleStintTracker::new();
        tracker.update(CAR, 2, false, 1);

        assert_eq!(tracker.update(CAR, 3, false, 4).pit_count, 4);
        // A smaller reported value never rolls the local count back.
        assert_eq!(tracker.update(CAR, 4, false, 2).pit_count, 4);
    }

    #[test]
    fn lap_regression_resets_last_pit_lap() {
        let mut tracker = VehicleStintTracker::new();
        tracker.update(CAR, 5, false, 0);
        tracker.update(CAR, 9, true, 0);
        tracker.update(CAR, 9, false, 0);

        // Session restarted; the stored pit lap exceeds the new count.
        let report = tracker.update(CAR, 2, false, 0);
        assert_eq!(report.stint_laps, 2);
    }

    #[test]
    fn vehicles_are_tracked_independently() {
        let mut tracker = VehicleStintTracker::new();
        let other = VehicleId(7);
        tracker.update(CAR, 5, false, 0);
        tracker.update(other, 5, false, 0);

        tracker.update(CAR, 6, true, 0);
        assert_eq!(tracker.update(other, 6, false, 0).pit_count, 0);
        assert_eq!(tracker.tracked(), 2);

        tracker.reset();
        assert_eq!(tracker.tracked(), 0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pit_count_never_decreases(
                ticks in proptest::collection::vec((0u32..30, any::<bool>(), 0u32..10), 1..100)
            ) {
                let mut tracker = VehicleStintTracker::new();
                let mut previous = 0;
                for (laps, in_pits, reported) in ticks {
                    let report = tracker.update(CAR, laps, in_pits, reported);
                    prop_assert!(report.pit_count >= previous);
                    previous = report.pit_count;
                }
            }
        }
    }
}
