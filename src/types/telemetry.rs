//! Decoded telemetry records.

use crate::types::VehicleId;

/// Per-wheel telemetry in producer units. Surface temperature arrives in
/// Kelvin and is converted at the accessor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelTelemetry {
    pub brake_temp: f32,
    pub pressure: f32,
    pub surface_temp: f32,
    pub wear: f32,
}

impl WheelTelemetry {
    pub fn surface_temp_celsius(&self) -> f32 {
        self.surface_temp - 273.15
    }
}

/// One vehicle's physics record. The producer updates telemetry at its own
/// rate independent of scoring, so `lap_number` here can lead or lag the
/// scoring lap count by a tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleTelemetry {
    pub id: VehicleId,
    pub lap_number: u32,
    /// -1 reverse, 0 neutral, forward gears from 1.
    pub gear: i32,
    /// 0 off, 1 on, 2 on with starter engaged.
    pub ignition: u8,
    pub speed_limiter: bool,
    pub engine_rpm: f32,
    pub engine_max_rpm: f32,
    pub fuel: f64,
    pub fuel_capacity: f64,
    /// Auxiliary energy budget, 0-100.
    pub virtual_energy: f64,
    pub lap_start_et: f64,
    pub lap_dist: f64,
    pub local_vel: [f64; 3],
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    pub steering: f32,
    pub unfiltered_throttle: f32,
    pub unfiltered_brake: f32,
    pub oil_temp: f32,
    pub water_temp: f32,
    /// FL, FR, RL, RR.
    pub wheels: [WheelTelemetry; 4],
}

impl VehicleTelemetry {
    /// Ground speed in m/s from the local velocity vector.
    pub fn speed_ms(&self) -> f64 {
        let [x, y, z] = self.local_vel;
        (x * x + y * y + z * z).sqrt()
    }

    /// Ground speed in km/h, the unit used in payloads.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_ms() * 3.6
    }

    pub fn ignition_on(&self) -> bool {
        self.ignition > 0
    }
}
