/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Cross-module round-trip laws from the testable-properties list: native read/write
//! bit-exactness, compressed encode/decode within per-stream tolerance, and gzip/plain
//! equivalence, all driven against a log big enough to exercise every axis kind at once.

use std::io::Cursor;

use trajectory_log::codec::{compressed, native};
use trajectory_log::header::{AxisKind, AxisScale, Header, MetaData, MlcModel};
use trajectory_log::subbeam::SubBeam;
use trajectory_log::{axis_data::AxisData, log::TrajectoryLog, scale};

fn build_sample_log() -> TrajectoryLog {
    let num_snapshots = 6;
    let mlc_model = MlcModel::Nds80;

    let axes_sampled = vec![
        AxisKind::CollX1,
        AxisKind::CollX2,
        AxisKind::CollY1,
        AxisKind::CollY2,
        AxisKind::CollRtn,
        AxisKind::GantryRtn,
        AxisKind::CouchVrt,
        AxisKind::CouchLng,
        AxisKind::CouchLat,
        AxisKind::CouchRtn,
        AxisKind::CouchPit,
        AxisKind::CouchRol,
        AxisKind::Mu,
        AxisKind::BeamHold,
        AxisKind::ControlPoint,
        AxisKind::Mlc,
    ];
    let mlc_stride = mlc_model.mlc_stride();
    let samples_per_axis: Vec<i32> = axes_sampled
        .iter()
        .map(|k| if *k == AxisKind::Mlc { mlc_stride } else { 2 })
        .collect();

    let header = Header {
        version: 3.0,
        sampling_interval_ms: 200,
        num_snapshots,
        axes_sampled: axes_sampled.clone(),
        samples_per_axis,
        axis_scale: AxisScale::ModifiedIec61217,
        num_sub_beams: 1,
        is_truncated: false,
        mlc_model,
    };

    let mut axis_data = Vec::new();
    for kind in axes_sampled.iter() {
        if *kind == AxisKind::Mlc {
            let stride = mlc_stride;
            let mut samples = Vec::with_capacity((stride * num_snapshots) as usize);
            for s in 0..num_snapshots {
                // 4 carriage values, then bank0/bank1 leaf expected/actual pairs.
                samples.push(100.0 + s as f32);
                samples.push(-100.0 - s as f32);
                samples.push(50.0);
                samples.push(-50.0);
                for _ in 0..mlc_model.num_leaf_pairs() * 2 {
                    let pos = 5.0 + s as f32 * 0.1;
                    samples.push(pos);
                    samples.push(pos + 0.05);
                }
            }
            axis_data.push(AxisData::new(*kind, stride, num_snapshots, samples).unwrap());
            continue;
        }

        let mut samples = Vec::with_capacity((num_snapshots * 2) as usize);
        for s in 0..num_snapshots {
            let base = match kind {
                AxisKind::GantryRtn => {
                    // Wraps through 0/360 across the recorded snapshots.
                    scale::normalize_360(356.0 + s as f32 as f64 * 2.0) as f32
                }
                AxisKind::Mu => s as f32 * 1.5,
                AxisKind::ControlPoint => (s / 2) as f32,
                AxisKind::BeamHold => 0.0,
                _ => 10.0 + s as f32 * 0.1,
            };
            samples.push(base);
            samples.push(base);
        }
        axis_data.push(AxisData::new(*kind, 2, num_snapshots, samples).unwrap());
    }

    let sub_beams = vec![SubBeam {
        control_point: 0,
        delivered_mu: 100.0,
        expected_rad_time: 30.0,
        sequence_number: 0,
        name: "Field 1".into(),
    }];

    let mut metadata = MetaData::default();
    metadata.patient_id = "12345".into();
    metadata.plan_name = "TestPlan".into();

    TrajectoryLog::new(header, metadata, sub_beams, axis_data).unwrap()
}

#[test]
fn native_round_trip_is_bit_exact() {
    let log = build_sample_log();

    let mut buf = Vec::new();
    native::write_to(&mut buf, &log).unwrap();
    let read_back = native::read_from(&mut Cursor::new(buf)).unwrap();

    assert_eq!(read_back.header.num_snapshots, log.header.num_snapshots);
    assert_eq!(read_back.header.axes_sampled, log.header.axes_sampled);
    assert_eq!(read_back.metadata.patient_id, log.metadata.patient_id);
    assert_eq!(read_back.sub_beams.len(), log.sub_beams.len());

    for (a, b) in log.axes().iter().zip(read_back.axes().iter()) {
        assert_eq!(a.samples(), b.samples());
    }
}

#[test]
fn compressed_v2_round_trip_within_tolerance() {
    let log = build_sample_log();

    let mut buf = Vec::new();
    compressed::write_to(&mut buf, &log, compressed::CompressedVersion::V2, false).unwrap();
    let read_back = compressed::read_from(&mut Cursor::new(buf)).unwrap();

    assert_eq!(read_back.header.num_snapshots, log.header.num_snapshots);

    for kind in &log.header.axes_sampled {
        if *kind == AxisKind::Mlc {
            continue;
        }
        let orig = log.axis(*kind).unwrap();
        let back = read_back.axis(*kind).unwrap();
        let tol: f32 = match kind {
            AxisKind::GantryRtn | AxisKind::CollRtn | AxisKind::CouchRtn => 0.05,
            AxisKind::CouchVrt | AxisKind::CouchLng | AxisKind::CouchLat => 0.02,
            AxisKind::Mu | AxisKind::ControlPoint => 0.002,
            _ => 0.05,
        };
        for s in 0..log.num_snapshots() {
            let (_, a_actual) = orig.scalar(s);
            let (_, b_actual) = back.scalar(s);
            let diff = if kind.is_full_rotation() {
                scale::shortest_arc_delta(a_actual as f64, b_actual as f64).abs()
            } else {
                (a_actual - b_actual).abs() as f64
            };
            assert!(
                diff <= tol as f64 + 1e-6,
                "axis {kind:?} snapshot {s}: |{a_actual} - {b_actual}| = {diff} > {tol}"
            );
        }
    }
}

#[test]
fn compressed_gzip_and_plain_decode_identically() {
    let log = build_sample_log();

    let mut plain = Vec::new();
    compressed::write_to(&mut plain, &log, compressed::CompressedVersion::V2, false).unwrap();
    let mut gzipped = Vec::new();
    compressed::write_to(&mut gzipped, &log, compressed::CompressedVersion::V2, true).unwrap();

    let from_plain = compressed::read_from(&mut Cursor::new(plain)).unwrap();
    let from_gzip = compressed::read_from(&mut Cursor::new(gzipped)).unwrap();

    for kind in &log.header.axes_sampled {
        let a = from_plain.axis(*kind).unwrap();
        let b = from_gzip.axis(*kind).unwrap();
        assert_eq!(a.samples(), b.samples());
    }
}

#[test]
fn native_then_compressed_then_native_preserves_header() {
    let log = build_sample_log();

    let mut native_buf = Vec::new();
    native::write_to(&mut native_buf, &log).unwrap();
    let reloaded = native::read_from(&mut Cursor::new(native_buf)).unwrap();

    let mut compressed_buf = Vec::new();
    compressed::write_to(&mut compressed_buf, &reloaded, compressed::CompressedVersion::V1, false).unwrap();
    let roundtripped = compressed::read_from(&mut Cursor::new(compressed_buf)).unwrap();

    assert_eq!(roundtripped.header.mlc_model.code(), log.header.mlc_model.code());
    assert_eq!(roundtripped.sub_beams[0].name, log.sub_beams[0].name);
    assert_eq!(roundtripped.num_snapshots(), log.num_snapshots());
}
