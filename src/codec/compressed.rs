/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Compressed `VOSTLC` format (§4.2, §6): delta + quantization per sample-stream, optional
//! gzip wrapper, and (v2.0) a per-stream dynamic scale table.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;

use super::common::{
    decode_fixed_string, map_io_err, read_bytes, read_f32, read_f64, read_i32, read_i8,
    read_i16, read_log_core, write_f32, write_f64, write_fixed_string, write_i32, write_i8,
    write_i16, write_log_core,
};
use crate::axis_data::AxisData;
use crate::error::{Result, TrajLogError};
use crate::header::{AxisKind, Header};
use crate::log::TrajectoryLog;
use crate::scale::normalize_180;

const SIGNATURE: &[u8] = b"VOSTLC";
const SIG_LEN: usize = 16;
const VERSION_LEN: usize = 16;
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const MAX_UNCOMPRESSED_BYTES: u64 = 100 * 1024 * 1024;

/// `1.0` uses fixed per-axis-kind scales and carries no scale table; `2.0` writes a dynamic
/// table chosen per stream (§4.2, §9 Open Questions — the version string is authoritative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedVersion {
    V1,
    V2,
}

impl CompressedVersion {
    fn as_str(self) -> &'static str {
        match self {
            CompressedVersion::V1 => "1.0",
            CompressedVersion::V2 => "2.0",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "1.0" => Ok(CompressedVersion::V1),
            "2.0" => Ok(CompressedVersion::V2),
            other => Err(TrajLogError::InvalidFormat(format!(
                "unknown compressed version {other:?}"
            ))),
        }
    }
}

/// Fixed per-axis-kind scale used by v1.0 files (no scale table on disk). Not specified
/// numerically by the format description beyond "fixed"; chosen here to give large streams
/// (positions in mm/MU, degrees) sub-0.01 resolution and small streams sub-0.1 resolution,
/// see the Open Question note in DESIGN.md.
fn fixed_scale(is_large: bool) -> f64 {
    if is_large {
        1000.0
    } else {
        100.0
    }
}

struct Stream {
    values: Vec<f64>,
    is_large: bool,
    is_rotation: bool,
}

fn collect_streams(log: &TrajectoryLog) -> Vec<Stream> {
    let mut streams = Vec::new();
    for axis in log.axes() {
        let kind = axis.kind();
        let stride = axis.stride();
        let is_large = kind.is_large_stream();
        let is_rotation = kind.is_full_rotation();
        for offset in 0..stride {
            let values = (0..axis.num_snapshots())
                .map(|s| axis.at(s, offset) as f64)
                .collect();
            streams.push(Stream {
                values,
                is_large,
                is_rotation,
            });
        }
    }
    streams
}

fn real_deltas(values: &[f64], is_rotation: bool) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if is_rotation {
                normalize_180(d)
            } else {
                d
            }
        })
        .collect()
}

fn clamp_scale(scale: f64) -> f64 {
    if !scale.is_finite() || scale <= 0.0 {
        return 1000.0;
    }
    scale.clamp(10.0, 100_000.0)
}

/// Dynamic per-stream scale selection (§4.2 "Dynamic scale selection (v2)").
fn choose_scale(values: &[f64], is_large: bool, is_rotation: bool) -> f64 {
    let (base_limit, delta_range) = if is_large {
        (i32::MAX as f64, 32_767.0)
    } else {
        (i16::MAX as f64, 127.0)
    };

    let max_abs = values.iter().cloned().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale_max = if max_abs > 0.0 {
        0.95 * base_limit / max_abs
    } else {
        1000.0
    };

    let deltas = real_deltas(values, is_rotation);
    if deltas.is_empty() {
        return clamp_scale(scale_max);
    }

    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / deltas.len() as f64;
    let tau = mean.abs() + 5.0 * variance.sqrt();

    let max_normal = deltas
        .iter()
        .cloned()
        .map(f64::abs)
        .filter(|&d| d <= tau)
        .fold(0.0_f64, f64::max);

    if max_normal <= 0.0 {
        return clamp_scale(scale_max);
    }

    clamp_scale(scale_max.min(0.9 * delta_range / max_normal))
}

fn quantize(value: f64, scale: f64, limit: i64, bits: u8) -> Result<i64> {
    let q = (value * scale).round() as i64;
    if q.abs() > limit {
        return Err(TrajLogError::QuantizationOverflow { value, bits });
    }
    Ok(q)
}

fn write_base<W: Write>(writer: &mut W, q: i64, is_large: bool) -> Result<()> {
    if is_large {
        write_i32(writer, q as i32)
    } else {
        write_i16(writer, q as i16)
    }
}

fn read_base<R: Read>(reader: &mut R, is_large: bool) -> Result<i64> {
    if is_large {
        read_i32(reader).map(|v| v as i64)
    } else {
        read_i16(reader).map(|v| v as i64)
    }
}

fn write_delta<W: Write>(writer: &mut W, d: i64, is_large: bool) -> Result<()> {
    if is_large {
        write_i16(writer, d as i16)
    } else {
        write_i8(writer, d as i8)
    }
}

fn read_delta<R: Read>(reader: &mut R, is_large: bool) -> Result<i64> {
    if is_large {
        read_i16(reader).map(|v| v as i64)
    } else {
        read_i8(reader).map(|v| v as i64)
    }
}

/// Encodes one stream (§4.2 "Encoding per stream"): base value, then escape-coded deltas
/// with shortest-arc normalization for full-rotation axes.
fn encode_stream<W: Write>(
    writer: &mut W,
    values: &[f64],
    scale: f64,
    is_large: bool,
    is_rotation: bool,
) -> Result<()> {
    let (base_bits, base_limit, delta_limit, escape) = if is_large {
        (32u8, i32::MAX as i64, 32_767i64, -32_768i64)
    } else {
        (16u8, i16::MAX as i64, 127i64, -128i64)
    };

    let mut prev = quantize(values[0], scale, base_limit, base_bits)?;
    write_base(writer, prev, is_large)?;

    let wrap = (360.0 * scale).round() as i64;
    let half_wrap = (180.0 * scale).round() as i64;

    for &v in &values[1..] {
        let q = quantize(v, scale, base_limit, base_bits)?;
        let mut delta = q - prev;
        if is_rotation {
            while delta > half_wrap {
                delta -= wrap;
            }
            while delta < -half_wrap {
                delta += wrap;
            }
        }

        if delta.abs() <= delta_limit {
            write_delta(writer, delta, is_large)?;
        } else {
            write_delta(writer, escape, is_large)?;
            write_base(writer, q, is_large)?;
        }
        prev = q;
    }
    Ok(())
}

fn decode_stream<R: Read>(
    reader: &mut R,
    n: usize,
    scale: f64,
    is_large: bool,
) -> Result<Vec<f64>> {
    let escape = if is_large { -32_768i64 } else { -128i64 };

    let mut out = Vec::with_capacity(n);
    let mut prev = read_base(reader, is_large)?;
    out.push(prev as f64 / scale);

    for _ in 1..n {
        let delta = read_delta(reader, is_large)?;
        let q = if delta == escape {
            read_base(reader, is_large)?
        } else {
            prev + delta
        };
        out.push(q as f64 / scale);
        prev = q;
    }
    Ok(out)
}

fn write_body<W: Write>(
    writer: &mut W,
    log: &TrajectoryLog,
    version: CompressedVersion,
) -> Result<()> {
    writer
        .write_all(&{
            let mut sig = vec![0u8; SIG_LEN];
            sig[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
            sig
        })
        .map_err(TrajLogError::Io)?;
    write_fixed_string(writer, version.as_str(), VERSION_LEN)?;
    write_f64(writer, log.header.version)?;
    write_log_core(writer, &log.header, &log.metadata, &log.sub_beams)?;

    let streams = collect_streams(log);
    let scales: Vec<f64> = match version {
        CompressedVersion::V1 => streams.iter().map(|s| fixed_scale(s.is_large)).collect(),
        CompressedVersion::V2 => streams
            .iter()
            .map(|s| choose_scale(&s.values, s.is_large, s.is_rotation))
            .collect(),
    };

    if version == CompressedVersion::V2 {
        write_i32(writer, scales.len() as i32)?;
        for &s in &scales {
            write_f32(writer, s as f32)?;
        }
    }

    for (stream, &scale) in streams.iter().zip(scales.iter()) {
        encode_stream(writer, &stream.values, scale, stream.is_large, stream.is_rotation)?;
    }

    debug!(
        "compressed codec: wrote {} streams at version {}",
        streams.len(),
        version.as_str()
    );
    Ok(())
}

fn read_body<R: Read>(reader: &mut R) -> Result<TrajectoryLog> {
    let sig = read_bytes(reader, SIG_LEN)?;
    if &sig[..SIGNATURE.len()] != SIGNATURE {
        return Err(TrajLogError::InvalidFormat(
            "compressed log signature mismatch, expected VOSTLC".into(),
        ));
    }

    let version_bytes = read_bytes(reader, VERSION_LEN)?;
    let version = CompressedVersion::parse(&decode_fixed_string(&version_bytes))?;
    let original_version = read_f64(reader)?;

    let core = read_log_core(reader)?;
    let header = Header {
        version: original_version,
        sampling_interval_ms: core.sampling_interval_ms,
        num_snapshots: core.num_snapshots,
        axes_sampled: core.axes_sampled,
        samples_per_axis: core.samples_per_axis,
        axis_scale: core.axis_scale,
        num_sub_beams: core.num_sub_beams,
        is_truncated: core.is_truncated,
        mlc_model: core.mlc_model,
    };
    header.validate()?;

    let total_stride: i64 = header.samples_per_axis.iter().map(|&s| s as i64).sum();
    let approx_uncompressed = total_stride * header.num_snapshots as i64 * 4;
    if approx_uncompressed as u64 > MAX_UNCOMPRESSED_BYTES {
        return Err(TrajLogError::InvalidFormat(format!(
            "uncompressed payload of ~{approx_uncompressed} bytes exceeds the 100 MiB limit"
        )));
    }

    let num_streams = total_stride as usize;
    let scales: Vec<f64> = match version {
        CompressedVersion::V2 => {
            let k = read_i32(reader)? as usize;
            if k != num_streams {
                return Err(TrajLogError::InvalidFormat(format!(
                    "scale table has {k} entries, expected {num_streams}"
                )));
            }
            (0..k)
                .map(|_| read_f32(reader).map(|v| v as f64))
                .collect::<Result<Vec<_>>>()?
        }
        CompressedVersion::V1 => header
            .axes_sampled
            .iter()
            .zip(header.samples_per_axis.iter())
            .flat_map(|(&kind, &stride): (&AxisKind, &i32)| {
                std::iter::repeat(fixed_scale(kind.is_large_stream())).take(stride as usize)
            })
            .collect(),
    };

    let num_snapshots = header.num_snapshots;
    let mut buffers: Vec<Vec<f32>> = header
        .samples_per_axis
        .iter()
        .map(|&stride| vec![0f32; stride as usize * num_snapshots as usize])
        .collect();

    let mut scale_idx = 0usize;
    for (axis_idx, (&kind, &stride)) in header
        .axes_sampled
        .iter()
        .zip(header.samples_per_axis.iter())
        .enumerate()
    {
        for offset in 0..stride {
            let scale = scales[scale_idx];
            scale_idx += 1;
            let values = decode_stream(reader, num_snapshots as usize, scale, kind.is_large_stream())?;
            for (s, v) in values.into_iter().enumerate() {
                buffers[axis_idx][s * stride as usize + offset as usize] = v as f32;
            }
        }
    }

    let axis_data = header
        .axes_sampled
        .iter()
        .zip(header.samples_per_axis.iter())
        .zip(buffers.into_iter())
        .map(|((&kind, &stride), samples)| AxisData::new(kind, stride, num_snapshots, samples))
        .collect::<Result<Vec<_>>>()?;

    TrajectoryLog::new(header, core.metadata, core.sub_beams, axis_data)
}

/// Writes `log` as a compressed `VOSTLC` body, optionally gzip-wrapped, to any `Write` sink.
pub fn write_to<W: Write>(
    writer: &mut W,
    log: &TrajectoryLog,
    version: CompressedVersion,
    gzip: bool,
) -> Result<()> {
    if gzip {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        write_body(&mut encoder, log, version)?;
        encoder.finish().map_err(TrajLogError::Io)?;
        Ok(())
    } else {
        write_body(writer, log, version)
    }
}

/// Writes `log` as a compressed `VOSTLC` file to `path`.
pub fn write<P: AsRef<Path>>(
    path: P,
    log: &TrajectoryLog,
    version: CompressedVersion,
    gzip: bool,
) -> Result<()> {
    let mut file = File::create(path).map_err(TrajLogError::Io)?;
    write_to(&mut file, log, version, gzip)
}

/// Reads a compressed `VOSTLC` stream, auto-detecting a gzip wrapper via its `1F 8B` magic.
pub fn read_from<R: Read>(reader: &mut R) -> Result<TrajectoryLog> {
    let mut magic = [0u8; 2];
    reader.read_exact(&mut magic).map_err(map_io_err)?;
    let chained = Cursor::new(magic).chain(reader);

    if magic == GZIP_MAGIC {
        let mut gz = GzDecoder::new(chained);
        read_body(&mut gz)
    } else {
        let mut plain = chained;
        read_body(&mut plain)
    }
}

/// Reads a compressed `VOSTLC` file from `path`.
pub fn read<P: AsRef<Path>>(path: P) -> Result<TrajectoryLog> {
    let mut file = File::open(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TrajLogError::NotFound(path.as_ref().display().to_string())
        } else {
            TrajLogError::Io(e)
        }
    })?;
    read_from(&mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{AxisScale, MetaData, MlcModel};
    use crate::subbeam::SubBeam;

    fn build_log() -> TrajectoryLog {
        let header = Header {
            version: 5.0,
            sampling_interval_ms: 1000,
            num_snapshots: 3,
            axes_sampled: vec![AxisKind::GantryRtn, AxisKind::Mu],
            samples_per_axis: vec![2, 2],
            axis_scale: AxisScale::MachineScale,
            num_sub_beams: 1,
            is_truncated: false,
            mlc_model: MlcModel::Nds80,
        };
        let metadata = MetaData::default();
        let sub_beams = vec![SubBeam {
            control_point: 0,
            delivered_mu: 100.0,
            expected_rad_time: 30.0,
            sequence_number: 0,
            name: "Field 1".into(),
        }];
        let axis_data = vec![
            // expected == actual for simplicity
            AxisData::new(
                AxisKind::GantryRtn,
                2,
                3,
                vec![358.0, 358.0, 360.0, 360.0, 2.0, 2.0],
            )
            .unwrap(),
            AxisData::new(AxisKind::Mu, 2, 3, vec![0.0, 0.0, 1.0, 1.0, 1.5, 1.5]).unwrap(),
        ];
        TrajectoryLog::new(header, metadata, sub_beams, axis_data).unwrap()
    }

    #[test]
    fn v2_round_trip_preserves_values_within_tolerance() {
        let log = build_log();
        let mut buf = Vec::new();
        write_to(&mut buf, &log, CompressedVersion::V2, false).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read_from(&mut cursor).unwrap();

        let mu_orig = log.axis(AxisKind::Mu).unwrap();
        let mu_parsed = parsed.axis(AxisKind::Mu).unwrap();
        for s in 0..3 {
            let (e0, a0) = mu_orig.scalar(s);
            let (e1, a1) = mu_parsed.scalar(s);
            assert!((e0 - e1).abs() <= 0.002, "MU expected drift too large");
            assert!((a0 - a1).abs() <= 0.002, "MU actual drift too large");
        }

        let gantry_orig = log.axis(AxisKind::GantryRtn).unwrap();
        let gantry_parsed = parsed.axis(AxisKind::GantryRtn).unwrap();
        for s in 0..3 {
            let (_, a0) = gantry_orig.scalar(s);
            let (_, a1) = gantry_parsed.scalar(s);
            assert!((a0 - a1).abs() <= 0.05, "gantry angle drift too large");
        }
    }

    #[test]
    fn rotation_deltas_stay_within_shortest_arc() {
        let log = build_log();
        let mut buf = Vec::new();
        write_to(&mut buf, &log, CompressedVersion::V2, false).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read_from(&mut cursor).unwrap();
        let gantry = parsed.axis(AxisKind::GantryRtn).unwrap();

        for s in 1..3 {
            let prev = gantry.scalar(s - 1).1 as f64;
            let curr = gantry.scalar(s).1 as f64;
            let d = crate::scale::shortest_arc_delta(prev, curr);
            assert!(d.abs() <= 180.0);
        }
    }

    #[test]
    fn gzip_and_plain_decode_identically() {
        let log = build_log();

        let mut plain_buf = Vec::new();
        write_to(&mut plain_buf, &log, CompressedVersion::V2, false).unwrap();
        let mut gz_buf = Vec::new();
        write_to(&mut gz_buf, &log, CompressedVersion::V2, true).unwrap();

        assert_eq!(gz_buf[0], GZIP_MAGIC[0]);
        assert_eq!(gz_buf[1], GZIP_MAGIC[1]);

        let plain_parsed = read_from(&mut Cursor::new(plain_buf)).unwrap();
        let gz_parsed = read_from(&mut Cursor::new(gz_buf)).unwrap();

        for axis_kind in [AxisKind::GantryRtn, AxisKind::Mu] {
            let a = plain_parsed.axis(axis_kind).unwrap();
            let b = gz_parsed.axis(axis_kind).unwrap();
            assert_eq!(a.samples(), b.samples());
        }
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = vec![0u8; SIG_LEN + VERSION_LEN];
        buf[..4].copy_from_slice(b"NOPE");
        let err = read_from(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, TrajLogError::InvalidFormat(_)));
    }
}
