//! Pure decode functions for shared memory blocks.
//!
//! Each function takes the raw bytes of one block copy and produces owned
//! records. Decoding never reads past the slice, never panics on arbitrary
//! input, and carries no state; callers decide what to do with a failure
//! (during steady-state polling the engine logs it and keeps the previous
//! good snapshot).
//!
//! ## Performance Characteristics
//!
//! - Explicit little-endian parsing with bounds checking on every read
//! - Only `num_vehicles` records are decoded, not the full 128-slot array
//! - String fields allocate once per decoded record

use crate::error::{BridgeError, Result};
use crate::schema::layout::*;
use crate::types::{
    ControlSource, ExtendedState, FinishStatus, PitMenuState, RulesParticipant, ScoringInfo,
    TrackRulesState, VehicleId, VehicleScoring, VehicleTelemetry, WeatherState, WheelTelemetry,
};

/// Header fields common to every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub layout_version: u32,
    pub version_begin: u32,
    pub version_end: u32,
}

impl BlockHeader {
    /// Decodes the 16-byte header at the start of a block.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(Self {
            layout_version: parse_u32_le(data, HDR_LAYOUT_VERSION)?,
            version_begin: parse_u32_le(data, HDR_VERSION_BEGIN)?,
            version_end: parse_u32_le(data, HDR_VERSION_END)?,
        })
    }

    /// True when the copy was not taken mid-write. The producer increments
    /// `version_begin` before a write and `version_end` after it.
    pub fn is_settled(&self) -> bool {
        self.version_begin == self.version_end
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout_version != LAYOUT_VERSION {
            return Err(BridgeError::Schema {
                expected: LAYOUT_VERSION,
                found: self.layout_version,
            });
        }
        Ok(())
    }
}

/// Decoded scoring block: header, session summary and the live vehicle array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringBlock {
    pub header: BlockHeader,
    pub info: ScoringInfo,
    pub vehicles: Vec<VehicleScoring>,
}

/// Decoded telemetry block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryBlock {
    pub header: BlockHeader,
    pub vehicles: Vec<VehicleTelemetry>,
}

pub fn decode_scoring(data: &[u8]) -> Result<ScoringBlock> {
    let header = BlockHeader::decode(data)?;
    header.validate()?;

    let num_vehicles = parse_vehicle_count(data, SCORING_NUM_VEHICLES, "scoring")?;
    let info = ScoringInfo {
        session_code: parse_i32_le(data, SCORING_SESSION_CODE)?,
        game_phase: parse_u8(data, SCORING_GAME_PHASE)?,
        in_realtime: parse_u8(data, SCORING_IN_REALTIME)? != 0,
        yellow_flag_state: parse_i8(data, SCORING_YELLOW_STATE)?,
        num_vehicles: num_vehicles as u32,
        max_laps: parse_i32_le(data, SCORING_MAX_LAPS)?.max(0) as u32,
        current_et: parse_f64_le(data, SCORING_CURRENT_ET)?,
        end_et: parse_f64_le(data, SCORING_END_ET)?,
        ambient_temp: parse_f64_le(data, SCORING_AMBIENT_TEMP)?,
        track_temp: parse_f64_le(data, SCORING_TRACK_TEMP)?,
        raining: parse_f64_le(data, SCORING_RAINING)?,
        dark_cloud: parse_f64_le(data, SCORING_DARK_CLOUD)?,
        min_path_wetness: parse_f64_le(data, SCORING_MIN_WETNESS)?,
        max_path_wetness: parse_f64_le(data, SCORING_MAX_WETNESS)?,
        wind_x: parse_f64_le(data, SCORING_WIND_X)?,
        wind_y: parse_f64_le(data, SCORING_WIND_Y)?,
        track_name: parse_string(data, SCORING_TRACK_NAME, SCORING_NAME_LEN)?,
        player_file: parse_string(data, SCORING_PLAYER_FILE, SCORING_NAME_LEN)?,
    };

    let mut vehicles = Vec::with_capacity(num_vehicles);
    for slot in 0..num_vehicles {
        let base = SCORING_VEHICLES_OFFSET + slot * VEHICLE_SCORING_SIZE;
        let record = slice_record(data, base, VEHICLE_SCORING_SIZE, "scoring vehicle")?;
        vehicles.push(decode_vehicle_scoring(record)?);
    }

    Ok(ScoringBlock { header, info, vehicles })
}

fn decode_vehicle_scoring(record: &[u8]) -> Result<VehicleScoring> {
    Ok(VehicleScoring {
        id: VehicleId(parse_i32_le(record, VSCORE_ID)?),
        place: parse_u8(record, VSCORE_PLACE)?,
        is_player: parse_u8(record, VSCORE_IS_PLAYER)? != 0,
        control: ControlSource::from_raw(parse_i8(record, VSCORE_CONTROL)?),
        in_pits: parse_u8(record, VSCORE_IN_PITS)? != 0,
        finish_status: FinishStatus::from_raw(parse_u8(record, VSCORE_FINISH_STATUS)?),
        sector: parse_u8(record, VSCORE_SECTOR)?,
        total_laps: parse_i32_le(record, VSCORE_TOTAL_LAPS)?.max(0) as u32,
        num_pitstops: parse_i32_le(record, VSCORE_NUM_PITSTOPS)?.max(0) as u32,
        num_penalties: parse_i32_le(record, VSCORE_NUM_PENALTIES)?.max(0) as u32,
        lap_dist: parse_f64_le(record, VSCORE_LAP_DIST)?,
        best_lap_time: parse_f64_le(record, VSCORE_BEST_LAP_TIME)?,
        last_lap_time: parse_f64_le(record, VSCORE_LAST_LAP_TIME)?,
        time_behind_leader: parse_f64_le(record, VSCORE_BEHIND_LEADER)?,
        time_behind_next: parse_f64_le(record, VSCORE_BEHIND_NEXT)?,
        pos_x: parse_f64_le(record, VSCORE_POS_X)?,
        pos_z: parse_f64_le(record, VSCORE_POS_Z)?,
        driver_name: parse_string(record, VSCORE_DRIVER_NAME, VSCORE_DRIVER_NAME_LEN)?,
        vehicle_name: parse_string(record, VSCORE_VEHICLE_NAME, VSCORE_VEHICLE_NAME_LEN)?,
        vehicle_class: parse_string(record, VSCORE_CLASS, VSCORE_CLASS_LEN)?,
    })
}

pub fn decode_telemetry(data: &[u8]) -> Result<TelemetryBlock> {
    let header = BlockHeader::decode(data)?;
    header.validate()?;

    let num_vehicles = parse_vehicle_count(data, TELEMETRY_NUM_VEHICLES, "telemetry")?;
    let mut vehicles = Vec::with_capacity(num_vehicles);
    for slot in 0..num_vehicles {
        let base = TELEMETRY_VEHICLES_OFFSET + slot * VEHICLE_TELEMETRY_SIZE;
        let record = slice_record(data, base, VEHICLE_TELEMETRY_SIZE, "telemetry vehicle")?;
        vehicles.push(decode_vehicle_telemetry(record)?);
    }

    Ok(TelemetryBlock { header, vehicles })
}

fn decode_vehicle_telemetry(record: &[u8]) -> Result<VehicleTelemetry> {
    let mut wheels = [WheelTelemetry::default(); WHEEL_COUNT];
    for (index, wheel) in wheels.iter_mut().enumerate() {
        let base = VTELE_WHEELS + index * WHEEL_TELEMETRY_SIZE;
        let wheel_record = slice_record(record, base, WHEEL_TELEMETRY_SIZE, "wheel")?;
        *wheel = WheelTelemetry {
            brake_temp: parse_f32_le(wheel_record, WHEEL_BRAKE_TEMP)?,
            pressure: parse_f32_le(wheel_record, WHEEL_PRESSURE)?,
            surface_temp: parse_f32_le(wheel_record, WHEEL_SURFACE_TEMP)?,
            wear: parse_f32_le(wheel_record, WHEEL_WEAR)?,
        };
    }

    Ok(VehicleTelemetry {
        id: VehicleId(parse_i32_le(record, VTELE_ID)?),
        lap_number: parse_i32_le(record, VTELE_LAP_NUMBER)?.max(0) as u32,
        gear: parse_i32_le(record, VTELE_GEAR)?,
        ignition: parse_u8(record, VTELE_IGNITION)?,
        speed_limiter: parse_u8(record, VTELE_SPEED_LIMITER)? != 0,
        engine_rpm: parse_f32_le(record, VTELE_ENGINE_RPM)?,
        engine_max_rpm: parse_f32_le(record, VTELE_ENGINE_MAX_RPM)?,
        fuel: parse_f64_le(record, VTELE_FUEL)?,
        fuel_capacity: parse_f64_le(record, VTELE_FUEL_CAPACITY)?,
        virtual_energy: parse_f64_le(record, VTELE_VIRTUAL_ENERGY)?,
        lap_start_et: parse_f64_le(record, VTELE_LAP_START_ET)?,
        lap_dist: parse_f64_le(record, VTELE_LAP_DIST)?,
        local_vel: [
            parse_f64_le(record, VTELE_LOCAL_VEL_X)?,
            parse_f64_le(record, VTELE_LOCAL_VEL_Y)?,
            parse_f64_le(record, VTELE_LOCAL_VEL_Z)?,
        ],
        throttle: parse_f32_le(record, VTELE_THROTTLE)?,
        brake: parse_f32_le(record, VTELE_BRAKE)?,
        clutch: parse_f32_le(record, VTELE_CLUTCH)?,
        steering: parse_f32_le(record, VTELE_STEERING)?,
        unfiltered_throttle: parse_f32_le(record, VTELE_UNFILTERED_THROTTLE)?,
        unfiltered_brake: parse_f32_le(record, VTELE_UNFILTERED_BRAKE)?,
        oil_temp: parse_f32_le(record, VTELE_OIL_TEMP)?,
        water_temp: parse_f32_le(record, VTELE_WATER_TEMP)?,
        wheels,
    })
}

pub fn decode_extended(data: &[u8]) -> Result<ExtendedState> {
    BlockHeader::decode(data)?.validate()?;
    Ok(ExtendedState {
        session_started: parse_u8(data, EXT_SESSION_STARTED)? != 0,
        traction_control: parse_u8(data, EXT_TRACTION_CONTROL)?,
        abs: parse_u8(data, EXT_ABS)?,
        pit_speed_limit: parse_f32_le(data, EXT_PIT_SPEED_LIMIT)?,
        fuel_mult: parse_f32_le(data, EXT_FUEL_MULT)?,
        tire_mult: parse_f32_le(data, EXT_TIRE_MULT)?,
    })
}

pub fn decode_pit(data: &[u8]) -> Result<PitMenuState> {
    BlockHeader::decode(data)?.validate()?;
    Ok(PitMenuState {
        category_index: parse_i32_le(data, PIT_CATEGORY_INDEX)?,
        choice_index: parse_i32_le(data, PIT_CHOICE_INDEX)?,
        num_choices: parse_i32_le(data, PIT_NUM_CHOICES)?,
        category_name: parse_string(data, PIT_CATEGORY_NAME, PIT_NAME_LEN)?,
        choice_string: parse_string(data, PIT_CHOICE_STRING, PIT_NAME_LEN)?,
    })
}

pub fn decode_rules(data: &[u8]) -> Result<TrackRulesState> {
    BlockHeader::decode(data)?.validate()?;

    let num_participants = parse_vehicle_count(data, RULES_NUM_PARTICIPANTS, "rules")?;
    let mut participants = Vec::with_capacity(num_participants);
    for slot in 0..num_participants {
        let base = RULES_PARTICIPANTS_OFFSET + slot * RULES_PARTICIPANT_SIZE;
        let record = slice_record(data, base, RULES_PARTICIPANT_SIZE, "rules participant")?;
        participants.push(RulesParticipant {
            id: VehicleId(parse_i32_le(record, RPART_ID)?),
            frozen_order: parse_i32_le(record, RPART_FROZEN_ORDER)?,
            yellow_severity: parse_f32_le(record, RPART_YELLOW_SEVERITY)?,
            pits_open: parse_u8(record, RPART_PITS_OPEN)? != 0,
        });
    }

    Ok(TrackRulesState {
        safety_car_active: parse_u8(data, RULES_SAFETY_CAR_ACTIVE)? != 0,
        safety_car_instruction: parse_u8(data, RULES_SAFETY_CAR_INSTRUCTION)?,
        yellow_flag_detected: parse_i8(data, RULES_YELLOW_DETECTED)?,
        yellow_flag_laps: parse_i8(data, RULES_YELLOW_LAPS)?,
        safety_car_laps: parse_i32_le(data, RULES_SAFETY_CAR_LAPS)?,
        participants,
    })
}

pub fn decode_weather(data: &[u8]) -> Result<WeatherState> {
    BlockHeader::decode(data)?.validate()?;
    Ok(WeatherState {
        et: parse_f64_le(data, WEATHER_ET)?,
        cloudiness: parse_f64_le(data, WEATHER_CLOUDINESS)?,
        ambient_temp: parse_f64_le(data, WEATHER_AMBIENT_TEMP)?,
        rain_severity: parse_f64_le(data, WEATHER_RAIN_SEVERITY)?,
    })
}

/// Reads a vehicle/participant count field and rejects values outside the
/// fixed slot range; garbage counts would otherwise walk past the block.
fn parse_vehicle_count(data: &[u8], offset: usize, context: &str) -> Result<usize> {
    let raw = parse_i32_le(data, offset)?;
    if raw < 0 || raw as usize > MAX_VEHICLES {
        return Err(BridgeError::Decode {
            context: context.to_string(),
            details: format!("vehicle count {} outside 0..={}", raw, MAX_VEHICLES),
        });
    }
    Ok(raw as usize)
}

fn slice_record<'a>(data: &'a [u8], offset: usize, size: usize, context: &str) -> Result<&'a [u8]> {
    data.get(offset..offset + size).ok_or_else(|| BridgeError::Decode {
        context: context.to_string(),
        details: format!(
            "record at offset {} needs {} bytes, block has {}",
            offset,
            size,
            data.len()
        ),
    })
}

/// Safe byte parsing helpers with bounds checking
fn parse_u8(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset).copied().ok_or_else(|| BridgeError::Decode {
        context: "Byte parsing".to_string(),
        details: format!("insufficient data for u8 at offset {} (have {})", offset, data.len()),
    })
}

fn parse_i8(data: &[u8], offset: usize) -> Result<i8> {
    Ok(parse_u8(data, offset)? as i8)
}

fn parse_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = data.get(offset..offset + 4).ok_or_else(|| BridgeError::Decode {
        context: "Integer parsing".to_string(),
        details: format!(
            "insufficient data for u32 at offset {} (need 4 bytes, have {})",
            offset,
            data.len()
        ),
    })?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn parse_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    Ok(parse_u32_le(data, offset)? as i32)
}

fn parse_f32_le(data: &[u8], offset: usize) -> Result<f32> {
    Ok(f32::from_bits(parse_u32_le(data, offset)?))
}

fn parse_f64_le(data: &[u8], offset: usize) -> Result<f64> {
    let bytes = data.get(offset..offset + 8).ok_or_else(|| BridgeError::Decode {
        context: "Double precision float parsing".to_string(),
        details: format!(
            "insufficient data for f64 at offset {} (need 8 bytes, have {})",
            offset,
            data.len()
        ),
    })?;
    Ok(f64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

/// Extracts a null-terminated string from a fixed-size field.
fn parse_string(data: &[u8], offset: usize, len: usize) -> Result<String> {
    let field = data.get(offset..offset + len).ok_or_else(|| BridgeError::Decode {
        context: "String parsing".to_string(),
        details: format!(
            "insufficient data for {}-byte string at offset {} (have {})",
            len,
            offset,
            data.len()
        ),
    })?;
    let null_pos = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(String::from_utf8_lossy(&field[..null_pos]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::encode;

    fn sample_scoring() -> (ScoringInfo, Vec<VehicleScoring>) {
        let info = ScoringInfo {
            session_code: 5,
            in_realtime: true,
            num_vehicles: 2,
            max_laps: 30,
            current_et: 125.5,
            end_et: 3600.0,
            ambient_temp: 24.0,
            track_temp: 31.5,
            track_name: "Circuit de la Sarthe".to_string(),
            player_file: "UserData\\player\\Settings\\player.JSON".to_string(),
            ..Default::default()
        };
        let vehicles = vec![
            VehicleScoring {
                id: VehicleId(21),
                place: 1,
                is_player: true,
                control: ControlSource::Local,
                total_laps: 4,
                lap_dist: 1250.0,
                best_lap_time: 212.4,
                driver_name: "P. Driver".to_string(),
                vehicle_name: "Oreca 07".to_string(),
                vehicle_class: "LMP2".to_string(),
                ..Default::default()
            },
            VehicleScoring {
                id: VehicleId(7),
                place: 2,
                in_pits: true,
                num_pitstops: 1,
                total_laps: 3,
                driver_name: "Rival".to_string(),
                vehicle_class: "GTE".to_string(),
                ..Default::default()
            },
        ];
        (info, vehicles)
    }

    #[test]
    fn scoring_round_trip_preserves_fields() {
        let (info, vehicles) = sample_scoring();
        let bytes = encode::encode_scoring(9, &info, &vehicles);
        let block = decode_scoring(&bytes).unwrap();

        assert_eq!(block.header.version_end, 9);
        assert!(block.header.is_settled());
        assert_eq!(block.info, info);
        assert_eq!(block.vehicles, vehicles);
    }

    #[test]
    fn telemetry_round_trip_preserves_fields() {
        let tele = VehicleTelemetry {
            id: VehicleId(21),
            lap_number: 4,
            gear: 3,
            ignition: 2,
            fuel: 48.25,
            virtual_energy: 82.0,
            lap_dist: 1250.0,
            local_vel: [0.0, 0.0, -55.0],
            throttle: 0.85,
            wheels: [
                WheelTelemetry { brake_temp: 410.0, pressure: 172.0, surface_temp: 363.0, wear: 0.97 };
                4
            ],
            ..Default::default()
        };
        let bytes = encode::encode_telemetry(3, &[tele.clone()]);
        let block = decode_telemetry(&bytes).unwrap();
        assert_eq!(block.vehicles, vec![tele]);
    }

    #[test]
    fn truncated_block_is_a_decode_error() {
        let err = decode_scoring(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
    }

    #[test]
    fn wrong_layout_version_is_a_schema_error() {
        let (info, vehicles) = sample_scoring();
        let mut bytes = encode::encode_scoring(1, &info, &vehicles);
        bytes[0..4].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_scoring(&bytes).unwrap_err();
        assert!(matches!(err, BridgeError::Schema { expected: LAYOUT_VERSION, found: 99 }));
    }

    #[test]
    fn hostile_vehicle_count_is_rejected() {
        let (info, vehicles) = sample_scoring();
        let mut bytes = encode::encode_scoring(1, &info, &vehicles);
        bytes[SCORING_NUM_VEHICLES..SCORING_NUM_VEHICLES + 4]
            .copy_from_slice(&500i32.to_le_bytes());
        assert!(decode_scoring(&bytes).is_err());

        bytes[SCORING_NUM_VEHICLES..SCORING_NUM_VEHICLES + 4]
            .copy_from_slice(&(-1i32).to_le_bytes());
        assert!(decode_scoring(&bytes).is_err());
    }

    #[test]
    fn torn_header_is_not_settled() {
        let (info, vehicles) = sample_scoring();
        let mut bytes = encode::encode_scoring(5, &info, &vehicles);
        bytes[HDR_VERSION_BEGIN..HDR_VERSION_BEGIN + 4].copy_from_slice(&6u32.to_le_bytes());
        let header = BlockHeader::decode(&bytes).unwrap();
        assert!(!header.is_settled());
    }

    #[test]
    fn auxiliary_blocks_round_trip() {
        let extended = ExtendedState {
            session_started: true,
            traction_control: 2,
            abs: 1,
            pit_speed_limit: 22.2,
            fuel_mult: 1.0,
            tire_mult: 2.0,
        };
        let decoded = decode_extended(&encode::encode_extended(1, &extended)).unwrap();
        assert_eq!(decoded, extended);

        let pit = PitMenuState {
            category_index: 3,
            choice_index: 1,
            num_choices: 6,
            category_name: "FUEL:".to_string(),
            choice_string: "+25.0L".to_string(),
        };
        let decoded = decode_pit(&encode::encode_pit(1, &pit)).unwrap();
        assert_eq!(decoded, pit);

        let rules = TrackRulesState {
            safety_car_active: true,
            safety_car_laps: 2,
            yellow_flag_detected: 1,
            participants: vec![RulesParticipant {
                id: VehicleId(21),
                frozen_order: 4,
                yellow_severity: 0.5,
                pits_open: true,
            }],
            ..Default::default()
        };
        let decoded = decode_rules(&encode::encode_rules(1, &rules)).unwrap();
        assert_eq!(decoded, rules);

        let weather = WeatherState {
            et: 99.0,
            cloudiness: 0.4,
            ambient_temp: 19.5,
            rain_severity: 0.1,
        };
        let decoded = decode_weather(&encode::encode_weather(1, &weather)).unwrap();
        assert_eq!(decoded, weather);
    }

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decoding_arbitrary_bytes_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
                let _ = decode_scoring(&data);
                let _ = decode_telemetry(&data);
                let _ = decode_extended(&data);
                let _ = decode_pit(&data);
                let _ = decode_rules(&data);
                let _ = decode_weather(&data);
                let _ = BlockHeader::decode(&data);
            }

            #[test]
            fn corrupting_one_byte_never_panics_scoring(
                corrupt_at in 0usize..512,
                corrupt_with in any::<u8>()
            ) {
                let (info, vehicles) = super::sample_scoring();
                let mut bytes = encode::encode_scoring(2, &info, &vehicles);
                let index = corrupt_at % bytes.len();
                bytes[index] = corrupt_with;
                let _ = decode_scoring(&bytes);
            }
        }
    }
}
