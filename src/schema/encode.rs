//! Block encoders, the inverse of [`crate::schema::decode`].
//!
//! The live game writes these blocks itself; encoding exists for the
//! producer simulator and for tests that need realistic block bytes
//! without a running game. Every encoder emits a full fixed-size block
//! with a settled header (`version_begin == version_end == version`).

use crate::schema::layout::*;
use crate::types::{
    ExtendedState, PitMenuState, ScoringInfo, TrackRulesState, VehicleScoring, VehicleTelemetry,
    WeatherState,
};

pub fn encode_scoring(version: u32, info: &ScoringInfo, vehicles: &[VehicleScoring]) -> Vec<u8> {
    let mut data = block_with_header(SCORING_BLOCK_SIZE, version);
    let count = vehicles.len().min(MAX_VEHICLES);

    put_i32_le(&mut data, SCORING_SESSION_CODE, info.session_code);
    put_u8(&mut data, SCORING_GAME_PHASE, info.game_phase);
    put_u8(&mut data, SCORING_IN_REALTIME, info.in_realtime as u8);
    put_i8(&mut data, SCORING_YELLOW_STATE, info.yellow_flag_state);
    put_i32_le(&mut data, SCORING_NUM_VEHICLES, count as i32);
    put_i32_le(&mut data, SCORING_MAX_LAPS, info.max_laps as i32);
    put_f64_le(&mut data, SCORING_CURRENT_ET, info.current_et);
    put_f64_le(&mut data, SCORING_END_ET, info.end_et);
    put_f64_le(&mut data, SCORING_AMBIENT_TEMP, info.ambient_temp);
    put_f64_le(&mut data, SCORING_TRACK_TEMP, info.track_temp);
    put_f64_le(&mut data, SCORING_RAINING, info.raining);
    put_f64_le(&mut data, SCORING_DARK_CLOUD, info.dark_cloud);
    put_f64_le(&mut data, SCORING_MIN_WETNESS, info.min_path_wetness);
    put_f64_le(&mut data, SCORING_MAX_WETNESS, info.max_path_wetness);
    put_f64_le(&mut data, SCORING_WIND_X, info.wind_x);
    put_f64_le(&mut data, SCORING_WIND_Y, info.wind_y);
    put_string(&mut data, SCORING_TRACK_NAME, SCORING_NAME_LEN, &info.track_name);
    put_string(&mut data, SCORING_PLAYER_FILE, SCORING_NAME_LEN, &info.player_file);

    for (slot, vehicle) in vehicles.iter().take(count).enumerate() {
        let base = SCORING_VEHICLES_OFFSET + slot * VEHICLE_SCORING_SIZE;
        encode_vehicle_scoring(&mut data[base..base + VEHICLE_SCORING_SIZE], vehicle);
    }

    data
}

fn encode_vehicle_scoring(record: &mut [u8], vehicle: &VehicleScoring) {
    put_i32_le(record, VSCORE_ID, vehicle.id.raw());
    put_u8(record, VSCORE_PLACE, vehicle.place);
    put_u8(record, VSCORE_IS_PLAYER, vehicle.is_player as u8);
    put_i8(record, VSCORE_CONTROL, vehicle.control as i8);
    put_u8(record, VSCORE_IN_PITS, vehicle.in_pits as u8);
    put_u8(record, VSCORE_FINISH_STATUS, vehicle.finish_status as u8);
    put_u8(record, VSCORE_SECTOR, vehicle.sector);
    put_i32_le(record, VSCORE_TOTAL_LAPS, vehicle.total_laps as i32);
    put_i32_le(record, VSCORE_NUM_PITSTOPS, vehicle.num_pitstops as i32);
    put_i32_le(record, VSCORE_NUM_PENALTIES, vehicle.num_penalties as i32);
    put_f64_le(record, VSCORE_LAP_DIST, vehicle.lap_dist);
    put_f64_le(record, VSCORE_BEST_LAP_TIME, vehicle.best_lap_time);
    put_f64_le(record, VSCORE_LAST_LAP_TIME, vehicle.last_lap_time);
    put_f64_le(record, VSCORE_BEHIND_LEADER, vehicle.time_behind_leader);
    put_f64_le(record, VSCORE_BEHIND_NEXT, vehicle.time_behind_next);
    put_f64_le(record, VSCORE_POS_X, vehicle.pos_x);
    put_f64_le(record, VSCORE_POS_Z, vehicle.pos_z);
    put_string(record, VSCORE_DRIVER_NAME, VSCORE_DRIVER_NAME_LEN, &vehicle.driver_name);
    put_string(record, VSCORE_VEHICLE_NAME, VSCORE_VEHICLE_NAME_LEN, &vehicle.vehicle_name);
    put_string(record, VSCORE_CLASS, VSCORE_CLASS_LEN, &vehicle.vehicle_class);
}

pub fn encode_telemetry(version: u32, vehicles: &[VehicleTelemetry]) -> Vec<u8> {
    let mut data = block_with_header(TELEMETRY_BLOCK_SIZE, version);
    let count = vehicles.len().min(MAX_VEHICLES);
    put_i32_le(&mut data, TELEMETRY_NUM_VEHICLES, count as i32);

    for (slot, vehicle) in vehicles.iter().take(count).enumerate() {
        let base = TELEMETRY_VEHICLES_OFFSET + slot * VEHICLE_TELEMETRY_SIZE;
        encode_vehicle_telemetry(&mut data[base..base + VEHICLE_TELEMETRY_SIZE], vehicle);
    }

    data
}

fn encode_vehicle_telemetry(record: &mut [u8], vehicle: &VehicleTelemetry) {
    put_i32_le(record, VTELE_ID, vehicle.id.raw());
    put_i32_le(record, VTELE_LAP_NUMBER, vehicle.lap_number as i32);
    put_i32_le(record, VTELE_GEAR, vehicle.gear);
    put_u8(record, VTELE_IGNITION, vehicle.ignition);
    put_u8(record, VTELE_SPEED_LIMITER, vehicle.speed_limiter as u8);
    put_f32_le(record, VTELE_ENGINE_RPM, vehicle.engine_rpm);
    put_f32_le(record, VTELE_ENGINE_MAX_RPM, vehicle.engine_max_rpm);
    put_f64_le(record, VTELE_FUEL, vehicle.fuel);
    put_f64_le(record, VTELE_FUEL_CAPACITY, vehicle.fuel_capacity);
    put_f64_le(record, VTELE_VIRTUAL_ENERGY, vehicle.virtual_energy);
    put_f64_le(record, VTELE_LAP_START_ET, vehicle.lap_start_et);
    put_f64_le(record, VTELE_LAP_DIST, vehicle.lap_dist);
    put_f64_le(record, VTELE_LOCAL_VEL_X, vehicle.local_vel[0]);
    put_f64_le(record, VTELE_LOCAL_VEL_Y, vehicle.local_vel[1]);
    put_f64_le(record, VTELE_LOCAL_VEL_Z, vehicle.local_vel[2]);
    put_f32_le(record, VTELE_THROTTLE, vehicle.throttle);
    put_f32_le(record, VTELE_BRAKE, vehicle.brake);
    put_f32_le(record, VTELE_CLUTCH, vehicle.clutch);
    put_f32_le(record, VTELE_STEERING, vehicle.steering);
    put_f32_le(record, VTELE_UNFILTERED_THROTTLE, vehicle.unfiltered_throttle);
    put_f32_le(record, VTELE_UNFILTERED_BRAKE, vehicle.unfiltered_brake);
    put_f32_le(record, VTELE_OIL_TEMP, vehicle.oil_temp);
    put_f32_le(record, VTELE_WATER_TEMP, vehicle.water_temp);

    for (index, wheel) in vehicle.wheels.iter().enumerate() {
        let base = VTELE_WHEELS + index * WHEEL_TELEMETRY_SIZE;
        let wheel_record = &mut record[base..base + WHEEL_TELEMETRY_SIZE];
        put_f32_le(wheel_record, WHEEL_BRAKE_TEMP, wheel.brake_temp);
        put_f32_le(wheel_record, WHEEL_PRESSURE, wheel.pressure);
        put_f32_le(wheel_record, WHEEL_SURFACE_TEMP, wheel.surface_temp);
        put_f32_le(wheel_record, WHEEL_WEAR, wheel.wear);
    }
}

pub fn encode_extended(version: u32, state: &ExtendedState) -> Vec<u8> {
    let mut data = block_with_header(EXTENDED_BLOCK_SIZE, version);
    put_u8(&mut data, EXT_SESSION_STARTED, state.session_started as u8);
    put_u8(&mut data, EXT_TRACTION_CONTROL, state.traction_control);
    put_u8(&mut data, EXT_ABS, state.abs);
    put_f32_le(&mut data, EXT_PIT_SPEED_LIMIT, state.pit_speed_limit);
    put_f32_le(&mut data, EXT_FUEL_MULT, state.fuel_mult);
    put_f32_le(&mut data, EXT_TIRE_MULT, state.tire_mult);
    data
}

pub fn encode_pit(version: u32, menu: &PitMenuState) -> Vec<u8> {
    let mut data = block_with_header(PIT_BLOCK_SIZE, version);
    put_i32_le(&mut data, PIT_CATEGORY_INDEX, menu.category_index);
    put_i32_le(&mut data, PIT_CHOICE_INDEX, menu.choice_index);
    put_i32_le(&mut data, PIT_NUM_CHOICES, menu.num_choices);
    put_string(&mut data, PIT_CATEGORY_NAME, PIT_NAME_LEN, &menu.category_name);
    put_string(&mut data, PIT_CHOICE_STRING, PIT_NAME_LEN, &menu.choice_string);
    data
}

pub fn encode_rules(version: u32, rules: &TrackRulesState) -> Vec<u8> {
    let mut data = block_with_header(RULES_BLOCK_SIZE, version);
    let count = rules.participants.len().min(MAX_VEHICLES);

    put_u8(&mut data, RULES_SAFETY_CAR_ACTIVE, rules.safety_car_active as u8);
    put_u8(&mut data, RULES_SAFETY_CAR_INSTRUCTION, rules.safety_car_instruction);
    put_i8(&mut data, RULES_YELLOW_DETECTED, rules.yellow_flag_detected);
    put_i8(&mut data, RULES_YELLOW_LAPS, rules.yellow_flag_laps);
    put_i32_le(&mut data, RULES_SAFETY_CAR_LAPS, rules.safety_car_laps);
    put_i32_le(&mut data, RULES_NUM_PARTICIPANTS, count as i32);

    for (slot, participant) in rules.participants.iter().take(count).enumerate() {
        let base = RULES_PARTICIPANTS_OFFSET + slot * RULES_PARTICIPANT_SIZE;
        let record = &mut data[base..base + RULES_PARTICIPANT_SIZE];
        put_i32_le(record, RPART_ID, participant.id.raw());
        put_i32_le(record, RPART_FROZEN_ORDER, participant.frozen_order);
        put_f32_le(record, RPART_YELLOW_SEVERITY, participant.yellow_severity);
        put_u8(record, RPART_PITS_OPEN, participant.pits_open as u8);
    }

    data
}

pub fn encode_weather(version: u32, weather: &WeatherState) -> Vec<u8> {
    let mut data = block_with_header(WEATHER_BLOCK_SIZE, version);
    put_f64_le(&mut data, WEATHER_ET, weather.et);
    put_f64_le(&mut data, WEATHER_CLOUDINESS, weather.cloudiness);
    put_f64_le(&mut data, WEATHER_AMBIENT_TEMP, weather.ambient_temp);
    put_f64_le(&mut data, WEATHER_RAIN_SEVERITY, weather.rain_severity);
    data
}

fn block_with_header(size: usize, version: u32) -> Vec<u8> {
    let mut data = vec![0u8; size];
    put_u32_le(&mut data, HDR_LAYOUT_VERSION, LAYOUT_VERSION);
    put_u32_le(&mut data, HDR_VERSION_BEGIN, version);
    put_u32_le(&mut data, HDR_VERSION_END, version);
    data
}

fn put_u8(data: &mut [u8], offset: usize, value: u8) {
    data[offset] = value;
}

fn put_i8(data: &mut [u8], offset: usize, value: i8) {
    data[offset] = value as u8;
}

fn put_u32_le(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_i32_le(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_f32_le(data: &mut [u8], offset: usize, value: f32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_f64_le(data: &mut [u8], offset: usize, value: f64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Writes a string into a fixed-size field, truncated and null-padded.
/// The final byte always stays null so decoders find a terminator.
fn put_string(data: &mut [u8], offset: usize, len: usize, value: &str) {
    let field = &mut data[offset..offset + len];
    field.fill(0);
    let bytes = value.as_bytes();
    let copy_len = bytes.len().min(len - 1);
    field[..copy_len].copy_from_slice(&bytes[..copy_len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_blocks_have_expected_sizes() {
        let scoring = encode_scoring(1, &ScoringInfo::default(), &[]);
        assert_eq!(scoring.len(), SCORING_BLOCK_SIZE);
        assert_eq!(encode_telemetry(1, &[]).len(), TELEMETRY_BLOCK_SIZE);
        assert_eq!(encode_extended(1, &ExtendedState::default()).len(), EXTENDED_BLOCK_SIZE);
        assert_eq!(encode_pit(1, &PitMenuState::default()).len(), PIT_BLOCK_SIZE);
        assert_eq!(encode_rules(1, &TrackRulesState::default()).len(), RULES_BLOCK_SIZE);
        assert_eq!(encode_weather(1, &WeatherState::default()).len(), WEATHER_BLOCK_SIZE);
    }

    #[test]
    fn header_carries_settled_version() {
        let data = encode_weather(42, &WeatherState::default());
        assert_eq!(&data[HDR_VERSION_BEGIN..HDR_VERSION_BEGIN + 4], &42u32.to_le_bytes());
        assert_eq!(&data[HDR_VERSION_END..HDR_VERSION_END + 4], &42u32.to_le_bytes());
    }

    #[test]
    fn long_strings_are_truncated_with_terminator() {
        let info = ScoringInfo {
            track_name: "x".repeat(200),
            ..Default::default()
        };
        let data = encode_scoring(1, &info, &[]);
        let field = &data[SCORING_TRACK_NAME..SCORING_TRACK_NAME + SCORING_NAME_LEN];
        assert_eq!(field[SCORING_NAME_LEN - 1], 0);
        assert!(field[..SCORING_NAME_LEN - 1].iter().all(|&b| b == b'x'));
    }

    #[test]
    fn vehicle_overflow_is_clamped_to_slot_count() {
        let vehicles = vec![VehicleScoring::default(); MAX_VEHICLES + 10];
        let data = encode_scoring(1, &ScoringInfo::default(), &vehicles);
        assert_eq!(data.len(), SCORING_BLOCK_SIZE);
        let count = i32::from_le_bytes(
            data[SCORING_NUM_VEHICLES..SCORING_NUM_VEHICLES + 4].try_into().unwrap(),
        );
        assert_eq!(count as usize, MAX_VEHICLES);
    }
}
