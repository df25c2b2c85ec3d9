//! Decoded scoring records.
//!
//! The scoring block carries the session summary plus one record per vehicle
//! in the field. Records here are plain owned copies; nothing borrows from
//! the shared region they were decoded from.

use crate::types::VehicleId;

/// Who is driving a vehicle. Discriminants are the producer's control codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum ControlSource {
    /// No controller assigned (empty or retired slot).
    #[default]
    Nobody = -1,
    /// The local player.
    Local = 0,
    /// The simulator's AI.
    Ai = 1,
    /// A remote player.
    Remote = 2,
    /// Replay playback.
    Replay = 3,
}

impl ControlSource {
    /// Maps the producer's control code.
    pub fn from_raw(raw: i8) -> Self {
        match raw {
            0 => ControlSource::Local,
            1 => ControlSource::Ai,
            2 => ControlSource::Remote,
            3 => ControlSource::Replay,
            _ => ControlSource::Nobody,
        }
    }
}

/// Whether and how a vehicle's session has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishStatus {
    #[default]
    None,
    Finished,
    Dnf,
    Dq,
}

impl FinishStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => FinishStatus::Finished,
            2 => FinishStatus::Dnf,
            3 => FinishStatus::Dq,
            _ => FinishStatus::None,
        }
    }
}

/// Which producer variant is publishing the blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimKind {
    #[default]
    RFactor2,
    LeMansUltimate,
}

impl SimKind {
    /// Short identifier used in payloads and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SimKind::RFactor2 => "RF2",
            SimKind::LeMansUltimate => "LMU",
        }
    }
}

/// Session-wide summary decoded from the scoring block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringInfo {
    pub session_code: i32,
    pub game_phase: u8,
    pub in_realtime: bool,
    pub yellow_flag_state: i8,
    pub num_vehicles: u32,
    pub max_laps: u32,
    pub current_et: f64,
    pub end_et: f64,
    pub ambient_temp: f64,
    pub track_temp: f64,
    pub raining: f64,
    pub dark_cloud: f64,
    pub min_path_wetness: f64,
    pub max_path_wetness: f64,
    pub wind_x: f64,
    pub wind_y: f64,
    pub track_name: String,
    pub player_file: String,
}

impl ScoringInfo {
    /// Seconds left in a timed session, clamped at zero.
    pub fn time_remaining(&self) -> f64 {
        (self.end_et - self.current_et).max(0.0)
    }

    /// Which producer variant wrote the block. Le Mans Ultimate keeps the
    /// player file under its Settings directory; rFactor 2 does not.
    pub fn sim_kind(&self) -> SimKind {
        if self.player_file.contains("Settings") {
            SimKind::LeMansUltimate
        } else {
            SimKind::RFactor2
        }
    }
}

/// One vehicle's scoring record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleScoring {
    pub id: VehicleId,
    /// Overall position, 1-based.
    pub place: u8,
    pub is_player: bool,
    pub control: ControlSource,
    pub in_pits: bool,
    pub finish_status: FinishStatus,
    /// Raw sector code: 0 is the start/finish sector.
    pub sector: u8,
    pub total_laps: u32,
    pub num_pitstops: u32,
    pub num_penalties: u32,
    pub lap_dist: f64,
    pub best_lap_time: f64,
    pub last_lap_time: f64,
    pub time_behind_leader: f64,
    pub time_behind_next: f64,
    pub pos_x: f64,
    pub pos_z: f64,
    pub driver_name: String,
    pub vehicle_name: String,
    pub vehicle_class: String,
}

impl VehicleScoring {
    /// Display sector number: the producer encodes the start/finish sector
    /// as 0, so codes map 0 -> 3, 1 -> 1, 2 -> 2.
    pub fn sector_number(&self) -> u8 {
        match self.sector {
            1 => 1,
            2 => 2,
            _ => 3,
        }
    }

    /// True when the local player is driving this vehicle.
    pub fn is_locally_driven(&self) -> bool {
        self.is_player && self.control == ControlSource::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_mapping_matches_producer_convention() {
        let mut vehicle = VehicleScoring::default();
        vehicle.sector = 0;
        assert_eq!(vehicle.sector_number(), 3);
        vehicle.sector = 1;
        assert_eq!(vehicle.sector_number(), 1);
        vehicle.sector = 2;
        assert_eq!(vehicle.sector_number(), 2);
    }

    #[test]
    fn time_remaining_clamps_at_zero() {
        let info = ScoringInfo { current_et: 4000.0, end_et: 3600.0, ..Default::default() };
        assert_eq!(info.time_remaining(), 0.0);

        let info = ScoringInfo { current_et: 100.0, end_et: 3600.0, ..Default::default() };
        assert_eq!(info.time_remaining(), 3500.0);
    }

    #[test]
    fn sim_kind_detected_from_player_file() {
        let lmu = ScoringInfo {
            player_file: "C:\\LMU\\UserData\\player\\Settings\\player.JSON".to_string(),
            ..Default::default()
        };
        assert_eq!(lmu.sim_kind(), SimKind::LeMansUltimate);
        assert_eq!(lmu.sim_kind().as_str(), "LMU");

        let rf2 = ScoringInfo {
            player_file: "C:\\rF2\\UserData\\player\\player.JSON".to_string(),
            ..Default::default()
        };
        assert_eq!(rf2.sim_kind(), SimKind::RFactor2);
        assert_eq!(rf2.sim_kind().as_str(), "RF2");
    }

    #[test]
    fn locally_driven_requires_player_and_local_control() {
        let mut vehicle = VehicleScoring::default();
        vehicle.is_player = true;
        vehicle.control = ControlSource::Local;
        assert!(vehicle.is_locally_driven());

        vehicle.control = ControlSource::Ai;
        assert!(!vehicle.is_locally_driven());

        vehicle.control = ControlSource::Local;
        vehicle.is_player = false;
        assert!(!vehicle.is_locally_driven());
    }
}
