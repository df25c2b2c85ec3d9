//! Lap-boundary consumption tracking
//!
//! Watches the player's lap number, fuel level and virtual energy level,
//! and on each completed lap folds the consumed amounts into running
//! means. Laps touched by the pit lane and deltas at or below a small
//! epsilon are discarded; refueling would otherwise register as negative
//! consumption.

use serde::Serialize;
use tracing::{debug, trace};

/// Deltas at or below this are noise or refueling artifacts.
const EPSILON: f64 = 0.01;

/// Rounded per-lap and running figures for display and payloads.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionStats {
    pub last_lap_fuel: f64,
    pub average_fuel: f64,
    pub last_lap_virtual_energy: f64,
    pub average_virtual_energy: f64,
    pub fuel_samples: u32,
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    lap: u32,
    fuel: f64,
    virtual_energy: f64,
}

/// Single-instance tracker scoped to the local player.
///
/// Starts without a baseline; the first observation only arms it. A lap
/// number below the baseline means the counter restarted, which re-arms
/// without folding a sample.
#[derive(Debug, Default)]
pub struct ConsumptionTracker {
    baseline: Option<Baseline>,
    last_fuel_delta: f64,
    average_fuel: f64,
    fuel_samples: u32,
    last_virtual_delta: f64,
    average_virtual: f64,
    virtual_samples: u32,
}

impl ConsumptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one aggregation tick's player state.
    pub fn observe(&mut self, lap: u32, fuel: f64, virtual_energy: f64, in_pits: bool) {
        let Some(baseline) = self.baseline else {
            self.baseline = Some(Baseline { lap, fuel, virtual_energy });
            return;
        };

        if lap < baseline.lap {
            trace!(from = baseline.lap, to = lap, "lap counter restarted, re-arming");
            self.baseline = Some(Baseline { lap, fuel, virtual_energy });
            return;
        }

        if lap == baseline.lap {
            return;
        }

        let fuel_delta = baseline.fuel - fuel;
        if !in_pits && fuel_delta > EPSILON {
            self.fuel_samples += 1;
            self.last_fuel_delta = fuel_delta;
            self.average_fuel += (fuel_delta - self.average_fuel) / self.fuel_samples as f64;

            // Virtual energy only counts on laps whose fuel sample was
            // accepted; cars without the system report a flat zero.
            let virtual_delta = baseline.virtual_energy - virtual_energy;
            if virtual_delta > EPSILON {
                self.virtual_samples += 1;
                self.last_virtual_delta = virtual_delta;
                self.average_virtual +=
                    (virtual_delta - self.average_virtual) / self.virtual_samples as f64;
            }

            debug!(
                lap,
                fuel_delta = format_args!("{:.2}", fuel_delta),
                average = format_args!("{:.2}", self.average_fuel),
                "lap consumption recorded"
            );
        } else {
            trace!(
                lap,
                in_pits,
                fuel_delta = format_args!("{:.2}", fuel_delta),
                "lap consumption sample discarded"
            );
        }

        self.baseline = Some(Baseline { lap, fuel, virtual_energy });
    }

    /// Pure read; rounds to 2 decimals.
    pub fn stats(&self) -> ConsumptionStats {
        ConsumptionStats {
            last_lap_fuel: round2(self.last_fuel_delta),
            average_fuel: round2(self.average_fuel),
            last_lap_virtual_energy: round2(self.last_virtual_delta),
            average_virtual_energy: round2(self.average_virtual),
            fuel_samples: self.fuel_samples,
        }
    }

    /// Drops the baseline and all accumulated figures.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
