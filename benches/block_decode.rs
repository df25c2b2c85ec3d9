//! Benchmarks for shared-memory block decoding
//!
//! Tests the per-poll decode budget for:
//! - Header probe and settling check that run on every poll
//! - Full scoring block decode at endurance grid sizes
//! - Full telemetry block decode at the vehicle cap
//!
//! Platform: Cross-platform (blocks are encoded in memory, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pitlink::schema::{BlockHeader, decode, encode};
use pitlink::types::{ScoringInfo, VehicleId, VehicleScoring, VehicleTelemetry};
use std::hint::black_box;

fn grid(count: usize) -> (ScoringInfo, Vec<VehicleScoring>, Vec<VehicleTelemetry>) {
    let info = ScoringInfo {
        session_code: 10,
        in_realtime: true,
        num_vehicles: count as u32,
        current_et: 7_240.0,
        end_et: 86_400.0,
        track_name: "Circuit de la Sarthe".to_string(),
        ..Default::default()
    };
    let scoring = (0..count)
        .map(|index| VehicleScoring {
            id: VehicleId(index as i32 + 1),
            place: index as u8 + 1,
            is_player: index == 0,
            total_laps: 40,
            lap_dist: 2_000.0 + index as f64,
            best_lap_time: 218.4,
            last_lap_time: 219.1,
            time_behind_leader: index as f64 * 1.5,
            driver_name: format!("Driver {index}"),
            vehicle_name: format!("Car {index}"),
            vehicle_class: "Hypercar".to_string(),
            ..Default::default()
        })
        .collect();
    let telemetry = (0..count)
        .map(|index| VehicleTelemetry {
            id: VehicleId(index as i32 + 1),
            lap_number: 40,
            gear: 6,
            engine_rpm: 7_900.0,
            fuel: 61.3,
            local_vel: [0.0, 0.0, -82.0],
            ..Default::default()
        })
        .collect();
    (info, scoring, telemetry)
}

fn bench_header_probe(c: &mut Criterion) {
    let (info, scoring, _) = grid(62);
    let bytes = encode::encode_scoring(9, &info, &scoring);

    let mut group = c.benchmark_group("header_probe");

    // The settling check runs before any full-region copy is attempted.
    group.bench_function("decode_and_settle", |b| {
        b.iter(|| {
            let header = BlockHeader::decode(black_box(&bytes)).unwrap();
            black_box(header.is_settled())
        })
    });

    group.bench_function("version_comparison", |b| {
        b.iter(|| {
            let seen = black_box(u32::MAX - 3);
            let read = black_box(2u32);
            black_box(read.wrapping_sub(seen) < u32::MAX / 2)
        })
    });

    group.finish();
}

fn bench_scoring_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring_decode");

    for count in [24, 62, 128] {
        let (info, scoring, _) = grid(count);
        let bytes = encode::encode_scoring(9, &info, &scoring);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(format!("grid_{count}"), |b| {
            b.iter(|| {
                let block = decode::decode_scoring(black_box(&bytes)).unwrap();
                black_box(block.vehicles.len())
            })
        });
    }

    group.finish();
}

fn bench_telemetry_decode(c: &mut Criterion) {
    let (_, _, telemetry) = grid(128);
    let bytes = encode::encode_telemetry(9, &telemetry);

    let mut group = c.benchmark_group("telemetry_decode");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("vehicle_cap", |b| {
        b.iter(|| {
            let block = decode::decode_telemetry(black_box(&bytes)).unwrap();
            black_box(block.vehicles.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_header_probe, bench_scoring_decode, bench_telemetry_decode);
criterion_main!(benches);
