/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Native `VOSTL` binary format (§4.1, §6): a fixed 1024-byte header, a sub-beam table, and
//! `float32` snapshot-major/axis-major/sample-minor payload.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;

use super::common::{
    decode_fixed_string, read_bytes, read_f32, read_i32, read_log_core, write_f32,
    write_fixed_string, write_i32, write_log_core, CORE_CONST_BYTES, METADATA_LEN,
};
use crate::axis_data::AxisData;
use crate::error::{Result, TrajLogError};
use crate::header::Header;
use crate::log::TrajectoryLog;
use crate::subbeam::SubBeam;

const SIGNATURE: &[u8] = b"VOSTL";
const SIG_LEN: usize = 16;
const VERSION_LEN: usize = 16;
const HEADER_SIZE: i32 = 1024;
/// signature(16) + version(16) + headerSize(4) + core constant fields(28) = 64.
const FIXED_HEADER_BYTES: usize = SIG_LEN + VERSION_LEN + 4 + CORE_CONST_BYTES;

fn native_pad(num_axes: usize) -> usize {
    HEADER_SIZE as usize - (FIXED_HEADER_BYTES + num_axes * 8) - METADATA_LEN
}

/// Result of `read_header_only`: everything short of the `float32` sample payload.
#[derive(Debug, Clone)]
pub struct NativeHeaderOnly {
    pub header: Header,
    pub metadata: crate::header::MetaData,
    pub sub_beams: Vec<SubBeam>,
}

fn read_header_and_subbeams<R: Read>(reader: &mut R) -> Result<NativeHeaderOnly> {
    let sig = read_bytes(reader, SIG_LEN)?;
    if &sig[..SIGNATURE.len()] != SIGNATURE {
        return Err(TrajLogError::InvalidFormat(
            "native log signature mismatch, expected VOSTL".into(),
        ));
    }

    let version_bytes = read_bytes(reader, VERSION_LEN)?;
    let version_text = decode_fixed_string(&version_bytes);
    let version: f64 = version_text
        .trim()
        .parse()
        .map_err(|_| TrajLogError::InvalidFormat(format!("unparseable version {version_text:?}")))?;

    let header_size = read_i32(reader)?;
    if header_size != HEADER_SIZE {
        return Err(TrajLogError::InvalidFormat(format!(
            "unexpected header size {header_size}, expected {HEADER_SIZE}"
        )));
    }

    let core = read_log_core(reader)?;
    let pad = native_pad(core.axes_sampled.len());
    let _ = read_bytes(reader, pad)?;

    let header = Header {
        version,
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

    Ok(NativeHeaderOnly {
        header,
        metadata: core.metadata,
        sub_beams: core.sub_beams,
    })
}

/// Parses the header and sub-beam table without touching the (often large) sample payload.
pub fn read_header_only<P: AsRef<Path>>(path: P) -> Result<NativeHeaderOnly> {
    let mut file = open_for_read(path)?;
    read_header_and_subbeams(&mut file)
}

fn open_for_read<P: AsRef<Path>>(path: P) -> Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TrajLogError::NotFound(path.as_ref().display().to_string())
        } else {
            TrajLogError::Io(e)
        }
    })
}

/// Parses a full native log, including the sample payload, from any `Read` source.
pub fn read_from<R: Read>(reader: &mut R) -> Result<TrajectoryLog> {
    let NativeHeaderOnly {
        header,
        metadata,
        sub_beams,
    } = read_header_and_subbeams(reader)?;

    let num_snapshots = header.num_snapshots;
    let mut buffers: Vec<Vec<f32>> = header
        .samples_per_axis
        .iter()
        .map(|&stride| vec![0f32; stride as usize * num_snapshots as usize])
        .collect();

    for snapshot in 0..num_snapshots {
        for (axis_idx, &stride) in header.samples_per_axis.iter().enumerate() {
            let base = (snapshot * stride) as usize;
            for k in 0..stride as usize {
                buffers[axis_idx][base + k] = read_f32(reader)?;
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

    debug!(
        "native codec: parsed {} snapshots across {} axes",
        num_snapshots,
        header.axes_sampled.len()
    );

    TrajectoryLog::new(header, metadata, sub_beams, axis_data)
}

/// Reads and fully parses a native `VOSTL` log from disk.
pub fn read<P: AsRef<Path>>(path: P) -> Result<TrajectoryLog> {
    let mut file = open_for_read(path)?;
    read_from(&mut file)
}

/// Serializes `log` into the native `VOSTL` layout on any `Write` sink; round-trips
/// bit-exact with `read_from` for any log constructed through `TrajectoryLog::new`.
pub fn write_to<W: Write>(writer: &mut W, log: &TrajectoryLog) -> Result<()> {
    let header = &log.header;
    let num_axes = header.axes_sampled.len();

    writer
        .write_all(&{
            let mut sig = vec![0u8; SIG_LEN];
            sig[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
            sig
        })
        .map_err(TrajLogError::Io)?;

    write_fixed_string(writer, &format!("{}", header.version), VERSION_LEN)?;
    write_i32(writer, HEADER_SIZE)?;

    write_log_core(writer, header, &log.metadata, &log.sub_beams)?;

    let pad = native_pad(num_axes);
    writer.write_all(&vec![0u8; pad]).map_err(TrajLogError::Io)?;

    for snapshot in 0..log.num_snapshots() {
        for axis in log.axes() {
            let stride = axis.stride();
            let base = (snapshot * stride) as usize;
            for k in 0..stride as usize {
                write_f32(writer, axis.samples()[base + k])?;
            }
        }
    }

    Ok(())
}

/// Writes `log` to `path` in the native `VOSTL` layout.
pub fn write<P: AsRef<Path>>(path: P, log: &TrajectoryLog) -> Result<()> {
    let mut file = File::create(path).map_err(TrajLogError::Io)?;
    write_to(&mut file, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{AxisKind, AxisScale, MetaData, MlcModel};
    use std::io::Cursor;

    fn sample_log() -> TrajectoryLog {
        let header = Header {
            version: 5.0,
            sampling_interval_ms: 20,
            num_snapshots: 3,
            axes_sampled: vec![AxisKind::CollX1, AxisKind::Mu],
            samples_per_axis: vec![2, 2],
            axis_scale: AxisScale::MachineScale,
            num_sub_beams: 1,
            is_truncated: false,
            mlc_model: MlcModel::Nds120,
        };
        let metadata = MetaData {
            patient_id: "12345".into(),
            plan_name: "Plan A".into(),
            plan_uid: "uid.1.2.3".into(),
            original_mu: "100".into(),
            remaining_mu: "50".into(),
            energy: "6X".into(),
            beam_name: "Field 1".into(),
        };
        let sub_beams = vec![SubBeam {
            control_point: 0,
            delivered_mu: 100.0,
            expected_rad_time: 60.0,
            sequence_number: 0,
            name: "Field 1".into(),
        }];
        let axis_data = vec![
            AxisData::new(AxisKind::CollX1, 2, 3, vec![1.0, 1.1, 2.0, 2.1, 3.0, 3.1]).unwrap(),
            AxisData::new(AxisKind::Mu, 2, 3, vec![0.0, 0.0, 0.0, 1.0, 1.5, 1.5]).unwrap(),
        ];
        TrajectoryLog::new(header, metadata, sub_beams, axis_data).unwrap()
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let log = sample_log();
        let mut buf = Vec::new();
        write_to(&mut buf, &log).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read_from(&mut cursor).unwrap();

        assert_eq!(parsed.header.version, log.header.version);
        assert_eq!(parsed.header.sampling_interval_ms, log.header.sampling_interval_ms);
        assert_eq!(parsed.header.num_snapshots, log.header.num_snapshots);
        assert_eq!(parsed.metadata.patient_id, log.metadata.patient_id);
        assert_eq!(parsed.sub_beams.len(), log.sub_beams.len());
        assert_eq!(parsed.sub_beams[0].name, log.sub_beams[0].name);
        for (a, b) in parsed.axes().iter().zip(log.axes().iter()) {
            assert_eq!(a.samples(), b.samples());
        }
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = vec![0u8; SIG_LEN];
        buf[..4].copy_from_slice(b"NOPE");
        let mut cursor = Cursor::new(buf);
        let err = read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, TrajLogError::InvalidFormat(_)));
    }

    #[test]
    fn rejects_truncated_file() {
        let log = sample_log();
        let mut buf = Vec::new();
        write_to(&mut buf, &log).unwrap();
        buf.truncate(buf.len() - 10);

        let mut cursor = Cursor::new(buf);
        let err = read_from(&mut cursor).unwrap_err();
        assert!(matches!(err, TrajLogError::UnexpectedEof));
    }

    #[test]
    fn header_only_skips_payload() {
        let log = sample_log();
        let mut buf = Vec::new();
        write_to(&mut buf, &log).unwrap();

        let mut cursor = Cursor::new(buf);
        let parsed = read_header_and_subbeams(&mut cursor).unwrap();
        assert_eq!(parsed.header.num_snapshots, 3);
        assert_eq!(parsed.sub_beams.len(), 1);
    }
}
