//! Decoded state from the smaller auxiliary blocks.

use crate::types::VehicleId;

/// Extended block: driving aids and session flags published outside scoring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtendedState {
    pub session_started: bool,
    pub traction_control: u8,
    pub abs: u8,
    /// Pit lane speed limit in m/s.
    pub pit_speed_limit: f32,
    pub fuel_mult: f32,
    pub tire_mult: f32,
}

/// Pit block: the in-game pit strategy menu position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitMenuState {
    pub category_index: i32,
    pub choice_index: i32,
    pub num_choices: i32,
    pub category_name: String,
    pub choice_string: String,
}

/// Per-vehicle entry in the rules block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RulesParticipant {
    pub id: VehicleId,
    pub frozen_order: i32,
    pub yellow_severity: f32,
    pub pits_open: bool,
}

/// Rules block: full-course condition state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackRulesState {
    pub safety_car_active: bool,
    pub safety_car_instruction: u8,
    pub yellow_flag_detected: i8,
    pub yellow_flag_laps: i8,
    pub safety_car_laps: i32,
    pub participants: Vec<RulesParticipant>,
}

impl TrackRulesState {
    /// Looks up a participant by stable vehicle id.
    pub fn participant(&self, id: VehicleId) -> Option<&RulesParticipant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// Weather block: the ambient scan the producer publishes alongside scoring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherState {
    pub et: f64,
    pub cloudiness: f64,
    pub ambient_temp: f64,
    pub rain_severity: f64,
}
