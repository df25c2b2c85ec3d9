//! The engine's published view of one poll.

use crate::types::{
    ExtendedState, PitMenuState, ScoringInfo, TrackRulesState, VehicleId, VehicleScoring,
    VehicleTelemetry, WeatherState,
};

/// Immutable copy of everything the poller decoded on one wake.
///
/// Built by the sync engine's poller thread and published behind an `Arc`
/// through a watch channel; readers clone the `Arc` and never observe a
/// record mid-overwrite. Player records are `None` until resolution has
/// succeeded at least once, and keep their last-good value while `paused`.
#[derive(Debug, Clone, Default)]
pub struct EngineSnapshot {
    pub info: ScoringInfo,
    pub vehicles: Vec<VehicleScoring>,
    pub extended: ExtendedState,
    pub pit_menu: PitMenuState,
    pub rules: TrackRulesState,
    pub weather: WeatherState,
    /// Resolved scoring slot for the local player, `None` while invalid.
    pub player_index: Option<usize>,
    pub player_scoring: Option<VehicleScoring>,
    pub player_telemetry: Option<VehicleTelemetry>,
    /// Scoring block update counter at the time of the copy.
    pub version: u32,
    /// True while the producer is frozen or the player is unresolvable.
    pub paused: bool,
}

impl EngineSnapshot {
    /// Finds a vehicle's scoring record by stable id.
    pub fn vehicle_by_id(&self, id: VehicleId) -> Option<&VehicleScoring> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// The overall race leader, when present.
    pub fn leader(&self) -> Option<&VehicleScoring> {
        self.vehicles.iter().find(|v| v.place == 1)
    }

    /// Player's position within their own vehicle class, 1-based.
    pub fn player_class_position(&self) -> Option<u32> {
        let player = self.player_scoring.as_ref()?;
        let mut ahead = 0u32;
        for vehicle in &self.vehicles {
            if vehicle.vehicle_class == player.vehicle_class && vehicle.place < player.place {
                ahead += 1;
            }
        }
        Some(ahead + 1)
    }
}
