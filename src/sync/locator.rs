//! Player resolution across the scoring and telemetry arrays
//!
//! The two arrays are indexed by slot, and slots shift when vehicles join
//! or leave. The stable key is the vehicle id, so resolution is two-level:
//! find the player's slot in scoring, then map the id to its telemetry
//! slot through a table rebuilt from scratch on every poll.

use std::collections::HashMap;

use crate::types::{VehicleId, VehicleScoring, VehicleTelemetry};

/// Why player resolution failed this poll. The two cases are routine
/// during menus and car swaps and drive retry accounting, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateFailure {
    /// No vehicle in the scoring array is flagged as the player.
    ScoringNotFound,
    /// The player's id has no slot in the telemetry array.
    TelemetryNotFound { id: VehicleId },
}

/// Resolved player position in both arrays for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSlots {
    pub id: VehicleId,
    pub scoring_index: usize,
    pub telemetry_index: usize,
}

/// Owns the id-to-telemetry-slot table. Lives on the poller thread.
#[derive(Debug, Default)]
pub struct PlayerLocator {
    telemetry_slots: HashMap<VehicleId, usize>,
}

impl PlayerLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the id table from this poll's telemetry array. Always a
    /// full rebuild; entries from earlier polls never survive.
    pub fn rebuild(&mut self, telemetry: &[VehicleTelemetry]) {
        self.telemetry_slots.clear();
        for (slot, vehicle) in telemetry.iter().enumerate() {
            self.telemetry_slots.insert(vehicle.id, slot);
        }
    }

    pub fn telemetry_slot(&self, id: VehicleId) -> Option<usize> {
        self.telemetry_slots.get(&id).copied()
    }

    /// Resolves the player. An override index, when set, replaces the
    /// `is_player` scan so spectators can follow any entry.
    pub fn locate(
        &self,
        scoring: &[VehicleScoring],
        override_index: Option<usize>,
    ) -> Result<PlayerSlots, LocateFailure> {
        let scoring_index = match override_index {
            Some(index) if index < scoring.len() => index,
            Some(_) => return Err(LocateFailure::ScoringNotFound),
            None => scoring
                .iter()
                .position(|vehicle| vehicle.is_player)
                .ok_or(LocateFailure::ScoringNotFound)?,
        };

        let id = scoring[scoring_index].id;
        let telemetry_index =
            self.telemetry_slot(id).ok_or(LocateFailure::TelemetryNotFound { id })?;

        Ok(PlayerSlots { id, scoring_index, telemetry_index })
    }
}
