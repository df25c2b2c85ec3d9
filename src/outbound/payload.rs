//! Outbound payload types
//!
//! Wire shapes for the collector: the per-tick summary, the one-shot
//! session-start record and the completed-lap upload. Everything here is
//! a plain serde type with camelCase keys; assembly from an engine
//! snapshot happens in [`build_tick`] so the bridge loop stays thin.

use std::collections::HashMap;

use serde::Serialize;

use crate::trackers::{ConsumptionStats, LapSample, StintReport};
use crate::types::{EngineSnapshot, SessionContext, SessionPhase, VehicleId};

/// One-shot record announcing a fresh session to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session_id: String,
    pub phase: SessionPhase,
    pub team_id: String,
    pub driver: String,
    pub track: String,
    pub car: String,
}

/// Completed-lap upload event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapUpload {
    pub session_id: String,
    pub lap_number: u32,
    pub driver: String,
    /// Zero when the scoring field never caught up before upload.
    pub lap_time: f64,
    pub samples: Vec<LapSample>,
}

/// The throttled per-tick summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickPayload {
    pub session_id: String,
    pub phase: SessionPhase,
    pub team_id: String,
    pub driver: String,
    pub session_time_remaining: f64,
    pub lap_number: u32,
    pub position: u8,
    pub class_position: u32,
    pub leader_average_lap: f64,
    pub consumption: ConsumptionStats,
    pub telemetry: Option<TelemetrySummary>,
    pub vehicles: Vec<VehicleLine>,
    pub rules: RulesSummary,
    pub pit_menu: PitSummary,
    pub weather: WeatherSummary,
}

/// One standings line per vehicle in the field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLine {
    pub id: VehicleId,
    pub driver: String,
    pub vehicle: String,
    #[serde(rename = "class")]
    pub vehicle_class: String,
    pub position: u8,
    pub laps: u32,
    pub in_pits: bool,
    pub pit_stops: u32,
    pub stint_laps: u32,
    pub best_lap_time: f64,
    pub last_lap_time: f64,
    pub gap_leader: f64,
    pub gap_next: f64,
    pub pos_x: f64,
    pub pos_z: f64,
}

/// Player cockpit summary for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySummary {
    pub gear: i32,
    pub rpm: f32,
    pub speed: f64,
    pub fuel: f64,
    pub fuel_capacity: f64,
    pub virtual_energy: f64,
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    pub steering: f32,
    pub oil_temp: f32,
    pub water_temp: f32,
    pub wheels: Vec<WheelLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelLine {
    pub surface_temp: f32,
    pub brake_temp: f32,
    pub pressure: f32,
    pub wear: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesSummary {
    pub safety_car_active: bool,
    pub safety_car_laps: i32,
    pub yellow_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PitSummary {
    pub category: String,
    pub choice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    pub ambient_temp: f64,
    pub track_temp: f64,
    pub raining: f64,
    pub min_wetness: f64,
    pub max_wetness: f64,
    pub wind_speed: f64,
}

/// Assembles the per-tick payload from one snapshot.
///
/// `stints` carries this tick's per-vehicle reports, keyed by stable id;
/// vehicles without a report (just joined) show zero pit data.
pub fn build_tick(
    snapshot: &EngineSnapshot,
    session: &SessionContext,
    consumption: ConsumptionStats,
    stints: &HashMap<VehicleId, StintReport>,
    team_id: &str,
    driver: &str,
) -> TickPayload {
    let player = snapshot.player_scoring.as_ref();

    let vehicles = snapshot
        .vehicles
        .iter()
        .map(|vehicle| {
            let stint = stints.get(&vehicle.id);
            VehicleLine {
                id: vehicle.id,
                driver: vehicle.driver_name.clone(),
                vehicle: vehicle.vehicle_name.clone(),
                vehicle_class: vehicle.vehicle_class.clone(),
                position: vehicle.place,
                laps: vehicle.total_laps,
                in_pits: vehicle.in_pits,
                pit_stops: stint.map(|s| s.pit_count).unwrap_or(vehicle.num_pitstops),
                stint_laps: stint.map(|s| s.stint_laps).unwrap_or_default(),
                best_lap_time: vehicle.best_lap_time,
                last_lap_time: vehicle.last_lap_time,
                gap_leader: vehicle.time_behind_leader,
                gap_next: vehicle.time_behind_next,
                pos_x: vehicle.pos_x,
                pos_z: vehicle.pos_z,
            }
        })
        .collect();

    let telemetry = snapshot.player_telemetry.as_ref().map(|t| TelemetrySummary {
        gear: t.gear,
        rpm: t.engine_rpm,
        speed: t.speed_kmh(),
        fuel: t.fuel,
        fuel_capacity: t.fuel_capacity,
        virtual_energy: t.virtual_energy,
        throttle: t.throttle,
        brake: t.brake,
        clutch: t.clutch,
        steering: t.steering,
        oil_temp: t.oil_temp,
        water_temp: t.water_temp,
        wheels: t
            .wheels
            .iter()
            .map(|w| WheelLine {
                surface_temp: w.surface_temp_celsius(),
                brake_temp: w.brake_temp,
                pressure: w.pressure,
                wear: w.wear,
            })
            .collect(),
    });

    TickPayload {
        session_id: session.history_id.clone(),
        phase: session.phase,
        team_id: team_id.to_string(),
        driver: driver.to_string(),
        session_time_remaining: snapshot.info.time_remaining(),
        lap_number: player.map(|p| p.total_laps).unwrap_or_default(),
        position: player.map(|p| p.place).unwrap_or_default(),
        class_position: snapshot.player_class_position().unwrap_or_default(),
        leader_average_lap: leader_average_lap(snapshot),
        consumption,
        telemetry,
        vehicles,
        rules: RulesSummary {
            safety_car_active: snapshot.rules.safety_car_active,
            safety_car_laps: snapshot.rules.safety_car_laps,
            yellow_flag: snapshot.rules.yellow_flag_detected > 0
                || snapshot.info.yellow_flag_state > 0,
        },
        pit_menu: PitSummary {
            category: snapshot.pit_menu.category_name.clone(),
            choice: snapshot.pit_menu.choice_string.clone(),
        },
        weather: WeatherSummary {
            ambient_temp: snapshot.info.ambient_temp,
            track_temp: snapshot.info.track_temp,
            raining: snapshot.info.raining,
            min_wetness: snapshot.info.min_path_wetness,
            max_wetness: snapshot.info.max_path_wetness,
            wind_speed: wind_speed(snapshot.info.wind_x, snapshot.info.wind_y),
        },
    }
}

/// Leader pace as elapsed session time over completed laps.
fn leader_average_lap(snapshot: &EngineSnapshot) -> f64 {
    match snapshot.leader() {
        Some(leader) if leader.total_laps > 0 => {
            snapshot.info.current_et / leader.total_laps as f64
        }
        _ => 0.0,
    }
}

fn wind_speed(x: f64, y: f64) -> f64 {
    (x * x + y * y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScoringInfo, VehicleScoring, VehicleTelemetry};

    fn session() -> SessionContext {
        SessionContext {
            code: 10,
            phase: SessionPhase::Race,
            history_id: "we-race_RACE_1750000000".to_string(),
        }
    }

    fn snapshot() -> EngineSnapshot {
        let vehicles = vec![
            VehicleScoring {
                id: VehicleId(7),
                place: 1,
                total_laps: 10,
                vehicle_class: "LMP2".to_string(),
                driver_name: "Leader".to_string(),
                ..Default::default()
            },
            VehicleScoring {
                id: VehicleId(21),
                place: 3,
                total_laps: 9,
                is_player: true,
                vehicle_class: "GTE".to_string(),
                driver_name: "Player".to_string(),
                ..Default::default()
            },
            VehicleScoring {
                id: VehicleId(4),
                place: 2,
                total_laps: 10,
                vehicle_class: "LMP2".to_string(),
                ..Default::default()
            },
        ];
        EngineSnapshot {
            info: ScoringInfo {
                current_et: 1000.0,
                end_et: 3600.0,
                ambient_temp: 21.0,
                wind_x: 3.0,
                wind_y: 4.0,
                ..Default::default()
            },
            player_index: Some(1),
            player_scoring: Some(vehicles[1].clone()),
            player_telemetry: Some(VehicleTelemetry {
                id: VehicleId(21),
                gear: 4,
                fuel: 41.5,
                ..Default::default()
            }),
            vehicles,
            ..Default::default()
        }
    }

    #[test]
    fn tick_payload_derives_positions_and_pace() {
        let mut stints = HashMap::new();
        stints.insert(VehicleId(21), StintReport { pit_count: 2, stint_laps: 4 });

        let payload = build_tick(
            &snapshot(),
            &session(),
            ConsumptionStats::default(),
            &stints,
            "we-race",
            "P. Driver",
        );

        assert_eq!(payload.session_time_remaining, 2600.0);
        assert_eq!(payload.position, 3);
        // Only player is in class GTE, so class position is 1.
        assert_eq!(payload.class_position, 1);
        assert_eq!(payload.leader_average_lap, 100.0);
        assert_eq!(payload.weather.wind_speed, 5.0);

        let player_line = payload.vehicles.iter().find(|v| v.id == VehicleId(21)).unwrap();
        assert_eq!(player_line.pit_stops, 2);
        assert_eq!(player_line.stint_laps, 4);
        assert_eq!(payload.telemetry.as_ref().unwrap().fuel, 41.5);
    }

    #[test]
    fn wire_keys_are_camel_case() {
        let payload = build_tick(
            &snapshot(),
            &session(),
            ConsumptionStats::default(),
            &HashMap::new(),
            "we-race",
            "P. Driver",
        );
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["sessionId"], "we-race_RACE_1750000000");
        assert_eq!(value["phase"], "RACE");
        assert!(value["sessionTimeRemaining"].is_number());
        assert_eq!(value["vehicles"][0]["class"], "LMP2");
        assert!(value["vehicles"][0]["gapLeader"].is_number());
        assert_eq!(value["consumption"]["lastLapFuel"], 0.0);
    }

    #[test]
    fn lap_upload_serializes_short_sample_keys() {
        let upload = LapUpload {
            session_id: "t_RACE_1".to_string(),
            lap_number: 12,
            driver: "P. Driver".to_string(),
            lap_time: 92.4,
            samples: vec![LapSample {
                lap_dist: 100.0,
                speed: 240.0,
                throttle: 1.0,
                brake: 0.0,
                gear: 6,
                rpm: 7400.0,
            }],
        };

        let value = serde_json::to_value(&upload).unwrap();
        assert_eq!(value["lapNumber"], 12);
        assert_eq!(value["samples"][0]["d"], 100.0);
        assert_eq!(value["samples"][0]["g"], 6);
    }

    #[test]
    fn missing_player_and_leader_degrade_to_zeroes() {
        let empty = EngineSnapshot::default();
        let payload = build_tick(
            &empty,
            &session(),
            ConsumptionStats::default(),
            &HashMap::new(),
            "t",
            "d",
        );
        assert_eq!(payload.position, 0);
        assert_eq!(payload.class_position, 0);
        assert_eq!(payload.leader_average_lap, 0.0);
        assert!(payload.telemetry.is_none());
        assert!(payload.vehicles.is_empty());
    }
}
