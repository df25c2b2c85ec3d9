//! Distance-keyed lap sample recording
//!
//! Buffers telemetry samples for the lap in progress and hands the buffer
//! off on rollover, gated on a minimum sample count so aborted or partial
//! laps never upload. The scoring block's last-lap time lags the lap
//! number by a few ticks, so a finalized buffer waits in a pending state
//! for a bounded number of ticks and then goes out with a placeholder
//! time instead of blocking the aggregation loop.

use serde::Serialize;
use tracing::{debug, trace};

use crate::types::{VehicleScoring, VehicleTelemetry};

/// One recorded point, keyed by track distance. Field names are kept to
/// one character on the wire to keep lap uploads small.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LapSample {
    #[serde(rename = "d")]
    pub lap_dist: f64,
    #[serde(rename = "v")]
    pub speed: f64,
    #[serde(rename = "t")]
    pub throttle: f32,
    #[serde(rename = "b")]
    pub brake: f32,
    #[serde(rename = "g")]
    pub gear: i32,
    #[serde(rename = "r")]
    pub rpm: f32,
}

/// A finished lap ready for upload. `lap_time` is `0.0` when the scoring
/// field never caught up within the wait window.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedLap {
    pub lap_number: u32,
    pub lap_time: f64,
    pub samples: Vec<LapSample>,
}

#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Buffers below this many samples are discarded at rollover.
    pub min_samples: usize,
    /// Minimum track-distance spacing between recorded samples.
    pub min_spacing: f64,
    /// Samples are only taken above this speed, in km/h.
    pub min_speed: f64,
    /// Ticks a finalized lap waits for a positive lap time.
    pub lap_time_wait_ticks: u32,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self { min_samples: 50, min_spacing: 2.0, min_speed: 1.0, lap_time_wait_ticks: 10 }
    }
}

struct PendingLap {
    lap_number: u32,
    samples: Vec<LapSample>,
    ticks_waited: u32,
}

impl PendingLap {
    fn into_completed(self, lap_time: f64) -> CompletedLap {
        CompletedLap { lap_number: self.lap_number, lap_time, samples: self.samples }
    }
}

/// Recorder for the local player's laps. Owned by the aggregation loop.
pub struct LapSampleRecorder {
    options: RecorderOptions,
    lap: u32,
    samples: Vec<LapSample>,
    last_distance: Option<f64>,
    pending: Option<PendingLap>,
}

impl LapSampleRecorder {
    pub fn new(options: RecorderOptions) -> Self {
        Self { options, lap: 0, samples: Vec::new(), last_distance: None, pending: None }
    }

    /// Feeds one aggregation tick. Returns a lap ready for upload when
    /// one finishes its lap-time wait (or flushes early on a rollover).
    pub fn tick(
        &mut self,
        telemetry: &VehicleTelemetry,
        scoring: &VehicleScoring,
    ) -> Option<CompletedLap> {
        let lap = telemetry.lap_number;
        let mut flushed = None;

        if lap != self.lap {
            if lap > self.lap && self.samples.len() >= self.options.min_samples {
                if let Some(stale) = self.pending.take() {
                    debug!(lap = stale.lap_number, "pending lap flushed by next rollover");
                    flushed = Some(stale.into_completed(0.0));
                }
                debug!(lap = self.lap, samples = self.samples.len(), "lap buffer finalized");
                self.pending = Some(PendingLap {
                    lap_number: self.lap,
                    samples: std::mem::take(&mut self.samples),
                    ticks_waited: 0,
                });
            } else if lap > self.lap {
                trace!(
                    lap = self.lap,
                    samples = self.samples.len(),
                    "lap buffer below threshold, discarded"
                );
                self.samples.clear();
            } else {
                trace!(from = self.lap, to = lap, "lap counter regressed, buffer dropped");
                self.samples.clear();
            }
            self.lap = lap;
            self.last_distance = None;
        }

        let speed = telemetry.speed_kmh();
        if speed > self.options.min_speed {
            let spaced = self
                .last_distance
                .is_none_or(|last| (telemetry.lap_dist - last).abs() > self.options.min_spacing);
            if spaced {
                self.samples.push(LapSample {
                    lap_dist: telemetry.lap_dist,
                    speed,
                    throttle: telemetry.throttle,
                    brake: telemetry.brake,
                    gear: telemetry.gear,
                    rpm: telemetry.engine_rpm,
                });
                self.last_distance = Some(telemetry.lap_dist);
            }
        }

        if flushed.is_none() {
            if let Some(mut pending) = self.pending.take() {
                if scoring.last_lap_time > 0.0 {
                    flushed = Some(pending.into_completed(scoring.last_lap_time));
                } else {
                    pending.ticks_waited += 1;
                    if pending.ticks_waited >= self.options.lap_time_wait_ticks {
                        debug!(
                            lap = pending.lap_number,
                            "lap time never arrived, uploading with placeholder"
                        );
                        flushed = Some(pending.into_completed(0.0));
                    } else {
                        self.pending = Some(pending);
                    }
                }
            }
        }

        flushed
    }

    /// How many samples the in-progress lap holds.
    pub fn buffered(&self) -> usize {
        self.samples.len()
    }

    /// Drops the buffer, the pending lap and the lap marker.
    pub fn reset(&mut self) {
        self.lap = 0;
        self.samples.clear();
        self.last_distance = None;
        self.pending = None;
    }
}
