//! Scripted block producer for development and tests
//!
//! Publishes a small simulated field through [`InMemoryBlocks`] using the
//! real block layout, so the full engine and bridge can run without the
//! game. Each [`SimProducer::advance`] call moves the field forward and
//! republishes every block with a bumped version counter; not calling it
//! leaves the version stalled, which is exactly how a paused game looks.
//!
//! The first vehicle in the script is the player and is under local
//! control; telemetry records are published in reverse field order so the
//! slot indices never line up between blocks.

use std::f64::consts::TAU;

use crate::blocks::InMemoryBlocks;
use crate::schema::{encode, layout};
use crate::types::{
    ControlSource, ExtendedState, PitMenuState, ScoringInfo, TrackRulesState, VehicleId,
    VehicleScoring, VehicleTelemetry, WeatherState, WheelTelemetry,
};

/// Fraction of a lap spent in the pit lane during a planned stop.
const PIT_WINDOW: f64 = 0.25;

/// One scripted vehicle.
#[derive(Debug, Clone)]
pub struct SimVehicleSpec {
    pub id: i32,
    pub driver: String,
    pub vehicle: String,
    pub class: String,
    /// Seconds per lap.
    pub pace: f64,
    /// Lap on which the vehicle makes a planned pit stop.
    pub pit_on_lap: Option<u32>,
}

/// Scripted session parameters.
#[derive(Debug, Clone)]
pub struct SimOptions {
    pub session_code: i32,
    pub track_name: String,
    /// Producer identity path; a path containing `Settings` reads as LMU.
    pub player_file: String,
    /// Track length in meters.
    pub lap_length: f64,
    pub fuel_capacity: f64,
    pub fuel_per_lap: f64,
    /// Virtual energy burn in percent per lap.
    pub energy_per_lap: f64,
    pub in_realtime: bool,
    /// The field; the first entry is the player.
    pub vehicles: Vec<SimVehicleSpec>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            session_code: 10,
            track_name: "Circuit de Virtualis".to_string(),
            player_file: "UserData\\player\\Settings\\player.JSON".to_string(),
            lap_length: 4200.0,
            fuel_capacity: 90.0,
            fuel_per_lap: 3.0,
            energy_per_lap: 4.0,
            in_realtime: true,
            vehicles: vec![
                SimVehicleSpec {
                    id: 1,
                    driver: "Home Driver".to_string(),
                    vehicle: "Prototype 07".to_string(),
                    class: "Hypercar".to_string(),
                    pace: 120.0,
                    pit_on_lap: None,
                },
                SimVehicleSpec {
                    id: 2,
                    driver: "Rival Driver".to_string(),
                    vehicle: "Prototype 08".to_string(),
                    class: "Hypercar".to_string(),
                    pace: 118.0,
                    pit_on_lap: Some(3),
                },
            ],
        }
    }
}

#[derive(Debug)]
struct SimVehicle {
    spec: SimVehicleSpec,
    /// Completed laps plus the fraction of the current one.
    progress: f64,
    fuel: f64,
    virtual_energy: f64,
    in_pits: bool,
    pit_count: u32,
}

impl SimVehicle {
    fn lap(&self) -> u32 {
        self.progress as u32
    }

    fn frac(&self) -> f64 {
        self.progress.fract()
    }
}

/// Scripted producer publishing all six blocks into an in-memory provider.
#[derive(Debug)]
pub struct SimProducer {
    blocks: InMemoryBlocks,
    options: SimOptions,
    vehicles: Vec<SimVehicle>,
    version: u32,
    elapsed: f64,
}

impl SimProducer {
    pub fn new(options: SimOptions) -> Self {
        let vehicles = options
            .vehicles
            .iter()
            .map(|spec| SimVehicle {
                spec: spec.clone(),
                progress: 0.0,
                fuel: options.fuel_capacity,
                virtual_energy: 100.0,
                in_pits: false,
                pit_count: 0,
            })
            .collect();
        Self { blocks: InMemoryBlocks::new(), options, vehicles, version: 0, elapsed: 0.0 }
    }

    /// Handle to the provider the blocks are published through.
    pub fn blocks(&self) -> InMemoryBlocks {
        self.blocks.clone()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Switches the session code; takes effect on the next publish.
    pub fn set_session_code(&mut self, code: i32) {
        self.options.session_code = code;
    }

    pub fn set_in_realtime(&mut self, in_realtime: bool) {
        self.options.in_realtime = in_realtime;
    }

    /// Simulates the producer exiting: every region disappears.
    pub fn take_offline(&mut self) {
        self.blocks.clear();
    }

    /// Moves the field forward by `dt` seconds of session time and
    /// republishes every block.
    pub fn advance(&mut self, dt: f64) {
        self.elapsed += dt;
        self.version = self.version.wrapping_add(1);

        for vehicle in &mut self.vehicles {
            vehicle.progress += dt / vehicle.spec.pace;

            let planned = vehicle
                .spec
                .pit_on_lap
                .is_some_and(|lap| vehicle.lap() == lap && vehicle.frac() < PIT_WINDOW);
            if planned && !vehicle.in_pits {
                vehicle.pit_count += 1;
                vehicle.fuel = self.options.fuel_capacity;
                vehicle.virtual_energy = 100.0;
            }
            vehicle.in_pits = planned;

            vehicle.fuel =
                (vehicle.fuel - dt / vehicle.spec.pace * self.options.fuel_per_lap).max(0.0);
            vehicle.virtual_energy = (vehicle.virtual_energy
                - dt / vehicle.spec.pace * self.options.energy_per_lap)
                .max(0.0);
        }

        self.publish();
    }

    fn publish(&self) {
        let scoring: Vec<VehicleScoring> =
            self.vehicles.iter().map(|vehicle| self.scoring_record(vehicle)).collect();
        let telemetry: Vec<VehicleTelemetry> =
            self.vehicles.iter().rev().map(|vehicle| self.telemetry_record(vehicle)).collect();

        let info = ScoringInfo {
            session_code: self.options.session_code,
            game_phase: 5,
            in_realtime: self.options.in_realtime,
            num_vehicles: self.vehicles.len() as u32,
            current_et: self.elapsed,
            end_et: 86_400.0,
            ambient_temp: 24.0,
            track_temp: 31.5,
            wind_x: 2.0,
            wind_y: 1.5,
            track_name: self.options.track_name.clone(),
            player_file: self.options.player_file.clone(),
            ..Default::default()
        };

        let extended = ExtendedState {
            session_started: true,
            traction_control: 3,
            abs: 1,
            pit_speed_limit: 27.77,
            fuel_mult: 1.0,
            tire_mult: 1.0,
        };
        let pit_menu = PitMenuState {
            category_index: 2,
            choice_index: 1,
            num_choices: 4,
            category_name: "FUEL:".to_string(),
            choice_string: "+25L".to_string(),
        };
        let rules = TrackRulesState::default();
        let weather = WeatherState {
            et: self.elapsed,
            cloudiness: 0.2,
            ambient_temp: 24.0,
            rain_severity: 0.0,
        };

        self.blocks
            .publish(layout::REGION_SCORING, encode::encode_scoring(self.version, &info, &scoring));
        self.blocks
            .publish(layout::REGION_TELEMETRY, encode::encode_telemetry(self.version, &telemetry));
        self.blocks
            .publish(layout::REGION_EXTENDED, encode::encode_extended(self.version, &extended));
        self.blocks.publish(layout::REGION_PIT_MENU, encode::encode_pit(self.version, &pit_menu));
        self.blocks.publish(layout::REGION_RULES, encode::encode_rules(self.version, &rules));
        self.blocks.publish(layout::REGION_WEATHER, encode::encode_weather(self.version, &weather));
    }

    fn leader_progress(&self) -> f64 {
        self.vehicles.iter().map(|vehicle| vehicle.progress).fold(0.0, f64::max)
    }

    fn scoring_record(&self, vehicle: &SimVehicle) -> VehicleScoring {
        let place = 1 + self
            .vehicles
            .iter()
            .filter(|other| other.progress > vehicle.progress)
            .count() as u8;
        let is_player = vehicle.spec.id == self.player_id();
        let lapped = vehicle.lap() >= 1;
        VehicleScoring {
            id: VehicleId(vehicle.spec.id),
            place,
            is_player,
            control: if is_player { ControlSource::Local } else { ControlSource::Remote },
            in_pits: vehicle.in_pits,
            sector: ((vehicle.frac() * 3.0) as u8).min(2),
            total_laps: vehicle.lap(),
            num_pitstops: vehicle.pit_count,
            lap_dist: vehicle.frac() * self.options.lap_length,
            best_lap_time: if lapped { vehicle.spec.pace } else { 0.0 },
            last_lap_time: if lapped { vehicle.spec.pace } else { 0.0 },
            time_behind_leader: (self.leader_progress() - vehicle.progress) * vehicle.spec.pace,
            pos_x: (vehicle.frac() * TAU).cos() * self.options.lap_length / TAU,
            pos_z: (vehicle.frac() * TAU).sin() * self.options.lap_length / TAU,
            driver_name: vehicle.spec.driver.clone(),
            vehicle_name: vehicle.spec.vehicle.clone(),
            vehicle_class: vehicle.spec.class.clone(),
            ..Default::default()
        }
    }

    fn telemetry_record(&self, vehicle: &SimVehicle) -> VehicleTelemetry {
        let speed = if vehicle.in_pits {
            27.0
        } else {
            self.options.lap_length / vehicle.spec.pace
        };
        VehicleTelemetry {
            id: VehicleId(vehicle.spec.id),
            lap_number: vehicle.lap(),
            gear: if vehicle.in_pits { 2 } else { 5 },
            ignition: 2,
            engine_rpm: 7_350.0,
            engine_max_rpm: 8_200.0,
            fuel: vehicle.fuel,
            fuel_capacity: self.options.fuel_capacity,
            virtual_energy: vehicle.virtual_energy,
            lap_start_et: self.elapsed - vehicle.frac() * vehicle.spec.pace,
            lap_dist: vehicle.frac() * self.options.lap_length,
            local_vel: [0.0, 0.0, -speed],
            throttle: 0.82,
            brake: 0.0,
            oil_temp: 108.0,
            water_temp: 92.0,
            wheels: [WheelTelemetry {
                brake_temp: 620.0,
                pressure: 172.0,
                surface_temp: 363.0,
                wear: 0.97,
            }; 4],
            ..Default::default()
        }
    }

    fn player_id(&self) -> i32 {
        self.options.vehicles.first().map(|spec| spec.id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::decode;

    #[test]
    fn published_blocks_decode_with_the_scripted_player() {
        let mut producer = SimProducer::new(SimOptions::default());
        producer.advance(30.0);
        producer.advance(30.0);

        let blocks = producer.blocks();
        let scoring = decode::decode_scoring(&blocks.bytes(layout::REGION_SCORING).unwrap())
            .expect("scoring decodes");
        assert_eq!(scoring.header.version_end, 2);
        assert_eq!(scoring.vehicles.len(), 2);

        let player = scoring.vehicles.iter().find(|v| v.is_player).expect("player present");
        assert_eq!(player.id, VehicleId(1));
        assert!(player.is_locally_driven());
        assert!(player.lap_dist > 0.0);

        let telemetry = decode::decode_telemetry(&blocks.bytes(layout::REGION_TELEMETRY).unwrap())
            .expect("telemetry decodes");
        // Telemetry is in reverse field order.
        assert_eq!(telemetry.vehicles[0].id, VehicleId(2));
        assert!(telemetry.vehicles[1].fuel < 90.0);
    }

    #[test]
    fn planned_stop_opens_the_pit_window_and_refuels() {
        let mut producer = SimProducer::new(SimOptions::default());

        // The rival pits on lap 3; march to just inside that lap.
        let mut pitted = false;
        for _ in 0..400 {
            producer.advance(1.0);
            let blocks = producer.blocks();
            let scoring =
                decode::decode_scoring(&blocks.bytes(layout::REGION_SCORING).unwrap()).unwrap();
            let rival = scoring.vehicles.iter().find(|v| v.id == VehicleId(2)).unwrap();
            if rival.in_pits {
                pitted = true;
                assert_eq!(rival.total_laps, 3);
                assert_eq!(rival.num_pitstops, 1);
                break;
            }
        }
        assert!(pitted);
    }

    #[test]
    fn going_offline_removes_every_region() {
        let mut producer = SimProducer::new(SimOptions::default());
        producer.advance(1.0);
        let blocks = producer.blocks();
        assert!(blocks.contains(layout::REGION_SCORING));

        producer.take_offline();
        assert!(!blocks.contains(layout::REGION_SCORING));
        assert!(!blocks.contains(layout::REGION_WEATHER));
    }
}
