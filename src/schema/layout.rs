//! Byte layout of the producer's shared memory blocks.
//!
//! All offsets are from the start of the block, all integers and floats are
//! little-endian, and all strings are fixed-size null-padded byte arrays.
//! Every block starts with the same 16-byte header:
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 4    | layout_version |
//! | 4      | 4    | version_begin  |
//! | 8      | 4    | version_end    |
//! | 12     | 4    | reserved       |
//!
//! `version_begin` is incremented by the producer before it writes a block
//! body and `version_end` after; equality means the body was not mid-write
//! when copied. `version_end` on the scoring block doubles as the liveness
//! counter the staleness logic keys on. The producer writes with no locking,
//! so even a matching pair is only a heuristic; consumers re-read a bounded
//! number of times and then accept the copy as-is.

/// Layout version stamped into every block header.
pub const LAYOUT_VERSION: u32 = 1;

/// Common block header size in bytes.
pub const BLOCK_HEADER_SIZE: usize = 16;

pub const HDR_LAYOUT_VERSION: usize = 0;
pub const HDR_VERSION_BEGIN: usize = 4;
pub const HDR_VERSION_END: usize = 8;

/// Maximum vehicle slots any block can describe.
pub const MAX_VEHICLES: usize = 128;

/// Mapping name prefix shared by every block; a process-id suffix may follow
/// the trailing `$` when addressing a dedicated server instance.
pub const REGION_PREFIX: &str = "$rFactor2SMMP_";

pub const REGION_SCORING: &str = "$rFactor2SMMP_Scoring$";
pub const REGION_TELEMETRY: &str = "$rFactor2SMMP_Telemetry$";
pub const REGION_EXTENDED: &str = "$rFactor2SMMP_Extended$";
pub const REGION_PIT_MENU: &str = "$rFactor2SMMP_PitInfo$";
pub const REGION_RULES: &str = "$rFactor2SMMP_Rules$";
pub const REGION_WEATHER: &str = "$rFactor2SMMP_Weather$";

// Scoring block
//
// | offset | size | field             |
// |--------|------|-------------------|
// | 16     | 4    | session_code i32  |
// | 20     | 1    | game_phase u8     |
// | 21     | 1    | in_realtime u8    |
// | 22     | 1    | yellow_flag_state i8 |
// | 23     | 1    | pad               |
// | 24     | 4    | num_vehicles i32  |
// | 28     | 4    | max_laps i32      |
// | 32     | 8    | current_et f64    |
// | 40     | 8    | end_et f64        |
// | 48     | 8    | ambient_temp f64  |
// | 56     | 8    | track_temp f64    |
// | 64     | 8    | raining f64       |
// | 72     | 8    | dark_cloud f64    |
// | 80     | 8    | min_path_wetness f64 |
// | 88     | 8    | max_path_wetness f64 |
// | 96     | 8    | wind_x f64        |
// | 104    | 8    | wind_y f64        |
// | 112    | 64   | track_name        |
// | 176    | 64   | player_file       |
// | 240    | ...  | vehicle array     |
pub const SCORING_SESSION_CODE: usize = 16;
pub const SCORING_GAME_PHASE: usize = 20;
pub const SCORING_IN_REALTIME: usize = 21;
pub const SCORING_YELLOW_STATE: usize = 22;
pub const SCORING_NUM_VEHICLES: usize = 24;
pub const SCORING_MAX_LAPS: usize = 28;
pub const SCORING_CURRENT_ET: usize = 32;
pub const SCORING_END_ET: usize = 40;
pub const SCORING_AMBIENT_TEMP: usize = 48;
pub const SCORING_TRACK_TEMP: usize = 56;
pub const SCORING_RAINING: usize = 64;
pub const SCORING_DARK_CLOUD: usize = 72;
pub const SCORING_MIN_WETNESS: usize = 80;
pub const SCORING_MAX_WETNESS: usize = 88;
pub const SCORING_WIND_X: usize = 96;
pub const SCORING_WIND_Y: usize = 104;
pub const SCORING_TRACK_NAME: usize = 112;
pub const SCORING_PLAYER_FILE: usize = 176;
pub const SCORING_NAME_LEN: usize = 64;
pub const SCORING_VEHICLES_OFFSET: usize = 240;

// Per-vehicle scoring record, relative offsets
//
// | offset | size | field                |
// |--------|------|----------------------|
// | 0      | 4    | id i32               |
// | 4      | 1    | place u8             |
// | 5      | 1    | is_player u8         |
// | 6      | 1    | control i8           |
// | 7      | 1    | in_pits u8           |
// | 8      | 1    | finish_status u8     |
// | 9      | 1    | sector u8            |
// | 10     | 2    | pad                  |
// | 12     | 4    | total_laps i32       |
// | 16     | 4    | num_pitstops i32     |
// | 20     | 4    | num_penalties i32    |
// | 24     | 8    | lap_dist f64         |
// | 32     | 8    | best_lap_time f64    |
// | 40     | 8    | last_lap_time f64    |
// | 48     | 8    | time_behind_leader f64 |
// | 56     | 8    | time_behind_next f64 |
// | 64     | 8    | pos_x f64            |
// | 72     | 8    | pos_z f64            |
// | 80     | 32   | driver_name          |
// | 112    | 64   | vehicle_name         |
// | 176    | 32   | vehicle_class        |
pub const VSCORE_ID: usize = 0;
pub const VSCORE_PLACE: usize = 4;
pub const VSCORE_IS_PLAYER: usize = 5;
pub const VSCORE_CONTROL: usize = 6;
pub const VSCORE_IN_PITS: usize = 7;
pub const VSCORE_FINISH_STATUS: usize = 8;
pub const VSCORE_SECTOR: usize = 9;
pub const VSCORE_TOTAL_LAPS: usize = 12;
pub const VSCORE_NUM_PITSTOPS: usize = 16;
pub const VSCORE_NUM_PENALTIES: usize = 20;
pub const VSCORE_LAP_DIST: usize = 24;
pub const VSCORE_BEST_LAP_TIME: usize = 32;
pub const VSCORE_LAST_LAP_TIME: usize = 40;
pub const VSCORE_BEHIND_LEADER: usize = 48;
pub const VSCORE_BEHIND_NEXT: usize = 56;
pub const VSCORE_POS_X: usize = 64;
pub const VSCORE_POS_Z: usize = 72;
pub const VSCORE_DRIVER_NAME: usize = 80;
pub const VSCORE_DRIVER_NAME_LEN: usize = 32;
pub const VSCORE_VEHICLE_NAME: usize = 112;
pub const VSCORE_VEHICLE_NAME_LEN: usize = 64;
pub const VSCORE_CLASS: usize = 176;
pub const VSCORE_CLASS_LEN: usize = 32;
pub const VEHICLE_SCORING_SIZE: usize = 208;

pub const SCORING_BLOCK_SIZE: usize =
    SCORING_VEHICLES_OFFSET + MAX_VEHICLES * VEHICLE_SCORING_SIZE;

// Telemetry block
//
// | offset | size | field            |
// |--------|------|------------------|
// | 16     | 4    | num_vehicles i32 |
// | 20     | 4    | pad              |
// | 24     | ...  | vehicle array    |
pub const TELEMETRY_NUM_VEHICLES: usize = 16;
pub const TELEMETRY_VEHICLES_OFFSET: usize = 24;

// Per-vehicle telemetry record, relative offsets
//
// | offset | size | field                  |
// |--------|------|------------------------|
// | 0      | 4    | id i32                 |
// | 4      | 4    | lap_number i32         |
// | 8      | 4    | gear i32               |
// | 12     | 1    | ignition u8            |
// | 13     | 1    | speed_limiter u8       |
// | 14     | 2    | pad                    |
// | 16     | 4    | engine_rpm f32         |
// | 20     | 4    | engine_max_rpm f32     |
// | 24     | 8    | fuel f64               |
// | 32     | 8    | fuel_capacity f64      |
// | 40     | 8    | virtual_energy f64     |
// | 48     | 8    | lap_start_et f64       |
// | 56     | 8    | lap_dist f64           |
// | 64     | 8    | local_vel_x f64        |
// | 72     | 8    | local_vel_y f64        |
// | 80     | 8    | local_vel_z f64        |
// | 88     | 4    | throttle f32           |
// | 92     | 4    | brake f32              |
// | 96     | 4    | clutch f32             |
// | 100    | 4    | steering f32           |
// | 104    | 4    | unfiltered_throttle f32 |
// | 108    | 4    | unfiltered_brake f32   |
// | 112    | 4    | oil_temp f32           |
// | 116    | 4    | water_temp f32         |
// | 120    | 64   | wheels (4 x 16)        |
pub const VTELE_ID: usize = 0;
pub const VTELE_LAP_NUMBER: usize = 4;
pub const VTELE_GEAR: usize = 8;
pub const VTELE_IGNITION: usize = 12;
pub const VTELE_SPEED_LIMITER: usize = 13;
pub const VTELE_ENGINE_RPM: usize = 16;
pub const VTELE_ENGINE_MAX_RPM: usize = 20;
pub const VTELE_FUEL: usize = 24;
pub const VTELE_FUEL_CAPACITY: usize = 32;
pub const VTELE_VIRTUAL_ENERGY: usize = 40;
pub const VTELE_LAP_START_ET: usize = 48;
pub const VTELE_LAP_DIST: usize = 56;
pub const VTELE_LOCAL_VEL_X: usize = 64;
pub const VTELE_LOCAL_VEL_Y: usize = 72;
pub const VTELE_LOCAL_VEL_Z: usize = 80;
pub const VTELE_THROTTLE: usize = 88;
pub const VTELE_BRAKE: usize = 92;
pub const VTELE_CLUTCH: usize = 96;
pub const VTELE_STEERING: usize = 100;
pub const VTELE_UNFILTERED_THROTTLE: usize = 104;
pub const VTELE_UNFILTERED_BRAKE: usize = 108;
pub const VTELE_OIL_TEMP: usize = 112;
pub const VTELE_WATER_TEMP: usize = 116;
pub const VTELE_WHEELS: usize = 120;

// Per-wheel record in order FL, FR, RL, RR
//
// | offset | size | field            |
// |--------|------|------------------|
// | 0      | 4    | brake_temp f32   |
// | 4      | 4    | pressure f32     |
// | 8      | 4    | surface_temp f32 |
// | 12     | 4    | wear f32         |
pub const WHEEL_BRAKE_TEMP: usize = 0;
pub const WHEEL_PRESSURE: usize = 4;
pub const WHEEL_SURFACE_TEMP: usize = 8;
pub const WHEEL_WEAR: usize = 12;
pub const WHEEL_TELEMETRY_SIZE: usize = 16;
pub const WHEEL_COUNT: usize = 4;

pub const VEHICLE_TELEMETRY_SIZE: usize = 120 + WHEEL_COUNT * WHEEL_TELEMETRY_SIZE;

pub const TELEMETRY_BLOCK_SIZE: usize =
    TELEMETRY_VEHICLES_OFFSET + MAX_VEHICLES * VEHICLE_TELEMETRY_SIZE;

// Extended block
//
// | offset | size | field               |
// |--------|------|---------------------|
// | 16     | 1    | session_started u8  |
// | 17     | 1    | traction_control u8 |
// | 18     | 1    | abs u8              |
// | 19     | 1    | pad                 |
// | 20     | 4    | pit_speed_limit f32 |
// | 24     | 4    | fuel_mult f32       |
// | 28     | 4    | tire_mult f32       |
pub const EXT_SESSION_STARTED: usize = 16;
pub const EXT_TRACTION_CONTROL: usize = 17;
pub const EXT_ABS: usize = 18;
pub const EXT_PIT_SPEED_LIMIT: usize = 20;
pub const EXT_FUEL_MULT: usize = 24;
pub const EXT_TIRE_MULT: usize = 28;
pub const EXTENDED_BLOCK_SIZE: usize = 32;

// Pit block (in-game pit menu state)
//
// | offset | size | field             |
// |--------|------|-------------------|
// | 16     | 4    | category_index i32 |
// | 20     | 4    | choice_index i32  |
// | 24     | 4    | num_choices i32   |
// | 28     | 4    | pad               |
// | 32     | 32   | category_name     |
// | 64     | 32   | choice_string     |
pub const PIT_CATEGORY_INDEX: usize = 16;
pub const PIT_CHOICE_INDEX: usize = 20;
pub const PIT_NUM_CHOICES: usize = 24;
pub const PIT_CATEGORY_NAME: usize = 32;
pub const PIT_CHOICE_STRING: usize = 64;
pub const PIT_NAME_LEN: usize = 32;
pub const PIT_BLOCK_SIZE: usize = 96;

// Rules block
//
// | offset | size | field                    |
// |--------|------|--------------------------|
// | 16     | 1    | safety_car_active u8     |
// | 17     | 1    | safety_car_instruction u8 |
// | 18     | 1    | yellow_flag_detected i8  |
// | 19     | 1    | yellow_flag_laps i8      |
// | 20     | 4    | safety_car_laps i32      |
// | 24     | 4    | num_participants i32     |
// | 28     | 4    | pad                      |
// | 32     | ...  | participant array        |
pub const RULES_SAFETY_CAR_ACTIVE: usize = 16;
pub const RULES_SAFETY_CAR_INSTRUCTION: usize = 17;
pub const RULES_YELLOW_DETECTED: usize = 18;
pub const RULES_YELLOW_LAPS: usize = 19;
pub const RULES_SAFETY_CAR_LAPS: usize = 20;
pub const RULES_NUM_PARTICIPANTS: usize = 24;
pub const RULES_PARTICIPANTS_OFFSET: usize = 32;

// Per-participant rules record, relative offsets
//
// | offset | size | field               |
// |--------|------|---------------------|
// | 0      | 4    | id i32              |
// | 4      | 4    | frozen_order i32    |
// | 8      | 4    | yellow_severity f32 |
// | 12     | 1    | pits_open u8        |
// | 13     | 3    | pad                 |
pub const RPART_ID: usize = 0;
pub const RPART_FROZEN_ORDER: usize = 4;
pub const RPART_YELLOW_SEVERITY: usize = 8;
pub const RPART_PITS_OPEN: usize = 12;
pub const RULES_PARTICIPANT_SIZE: usize = 16;

pub const RULES_BLOCK_SIZE: usize =
    RULES_PARTICIPANTS_OFFSET + MAX_VEHICLES * RULES_PARTICIPANT_SIZE;

// Weather block
//
// | offset | size | field             |
// |--------|------|-------------------|
// | 16     | 8    | et f64            |
// | 24     | 8    | cloudiness f64    |
// | 32     | 8    | ambient_temp f64  |
// | 40     | 8    | rain_severity f64 |
pub const WEATHER_ET: usize = 16;
pub const WEATHER_CLOUDINESS: usize = 24;
pub const WEATHER_AMBIENT_TEMP: usize = 32;
pub const WEATHER_RAIN_SEVERITY: usize = 40;
pub const WEATHER_BLOCK_SIZE: usize = 48;

/// Expected byte size for a named region, used when mapping and when sizing
/// simulated regions. Returns `None` for names outside the block set.
pub fn region_size(name: &str) -> Option<usize> {
    // A process-id suffix may trail the canonical name.
    let base = match name.get(1..).and_then(|rest| rest.find('$')) {
        Some(end) => &name[..=end + 1],
        None => name,
    };
    match base {
        REGION_SCORING => Some(SCORING_BLOCK_SIZE),
        REGION_TELEMETRY => Some(TELEMETRY_BLOCK_SIZE),
        REGION_EXTENDED => Some(EXTENDED_BLOCK_SIZE),
        REGION_PIT_MENU => Some(PIT_BLOCK_SIZE),
        REGION_RULES => Some(RULES_BLOCK_SIZE),
        REGION_WEATHER => Some(WEATHER_BLOCK_SIZE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_are_consistent() {
        assert_eq!(VEHICLE_SCORING_SIZE, 208);
        assert_eq!(VEHICLE_TELEMETRY_SIZE, 184);
        assert_eq!(SCORING_BLOCK_SIZE, 240 + 128 * 208);
        assert_eq!(TELEMETRY_BLOCK_SIZE, 24 + 128 * 184);
        assert_eq!(RULES_BLOCK_SIZE, 32 + 128 * 16);
    }

    #[test]
    fn region_size_resolves_canonical_names() {
        assert_eq!(region_size(REGION_SCORING), Some(SCORING_BLOCK_SIZE));
        assert_eq!(region_size(REGION_WEATHER), Some(WEATHER_BLOCK_SIZE));
        assert_eq!(region_size("$rFactor2SMMP_Nothing$"), None);
    }

    #[test]
    fn region_size_tolerates_pid_suffix() {
        assert_eq!(region_size("$rFactor2SMMP_Scoring$4216"), Some(SCORING_BLOCK_SIZE));
        assert_eq!(region_size("$rFactor2SMMP_PitInfo$4216"), Some(PIT_BLOCK_SIZE));
    }
}
