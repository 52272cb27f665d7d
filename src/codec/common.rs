/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Byte-level plumbing shared by the native and compressed codecs: the header/metadata/
//! sub-beam block both formats carry verbatim, just with different framing around it
//! (native wraps it in a padded 1024-byte block; compressed does not).

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, TrajLogError};
use crate::header::{AxisKind, AxisScale, Header, MetaData, MlcModel};
use crate::subbeam::SubBeam;

pub(crate) const METADATA_LEN: usize = 745;
pub(crate) const SUBBEAM_NAME_LEN: usize = 512;
pub(crate) const SUBBEAM_RESERVED: usize = 32;

/// `int32 controlPoint + float32 MU + float32 radTime + int32 sequenceNumber + name + reserved`.
pub(crate) const SUBBEAM_RECORD_LEN: usize = 4 + 4 + 4 + 4 + SUBBEAM_NAME_LEN + SUBBEAM_RESERVED;

/// Byte count of the core fields excluding per-axis arrays and the metadata block:
/// samplingInterval, NumAxesSampled, axisScale, NumSubBeams, isTruncated, NumSnapshots, MlcModel.
pub(crate) const CORE_CONST_BYTES: usize = 7 * 4;

pub(crate) fn map_io_err(e: std::io::Error) -> TrajLogError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        TrajLogError::UnexpectedEof
    } else {
        TrajLogError::Io(e)
    }
}

pub(crate) fn read_bytes<R: Read>(reader: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf).map_err(map_io_err)?;
    Ok(buf)
}

pub(crate) fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    reader.read_i32::<LittleEndian>().map_err(map_io_err)
}

pub(crate) fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    reader.read_f32::<LittleEndian>().map_err(map_io_err)
}

pub(crate) fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    reader.read_f64::<LittleEndian>().map_err(map_io_err)
}

pub(crate) fn read_i16<R: Read>(reader: &mut R) -> Result<i16> {
    reader.read_i16::<LittleEndian>().map_err(map_io_err)
}

pub(crate) fn read_i8<R: Read>(reader: &mut R) -> Result<i8> {
    reader.read_i8().map_err(map_io_err)
}

pub(crate) fn write_i16<W: Write>(writer: &mut W, v: i16) -> Result<()> {
    writer.write_i16::<LittleEndian>(v).map_err(TrajLogError::Io)
}

pub(crate) fn write_i8<W: Write>(writer: &mut W, v: i8) -> Result<()> {
    writer.write_i8(v).map_err(TrajLogError::Io)
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, v: i32) -> Result<()> {
    writer.write_i32::<LittleEndian>(v).map_err(TrajLogError::Io)
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, v: f32) -> Result<()> {
    writer.write_f32::<LittleEndian>(v).map_err(TrajLogError::Io)
}

pub(crate) fn write_f64<W: Write>(writer: &mut W, v: f64) -> Result<()> {
    writer.write_f64::<LittleEndian>(v).map_err(TrajLogError::Io)
}

/// Trims at the first NUL, then strips stray tab bytes, per the §6 "null/tab trimming" rule.
pub(crate) fn decode_fixed_string(bytes: &[u8]) -> String {
    let trimmed = bytes
        .iter()
        .position(|&b| b == 0)
        .map(|end| &bytes[..end])
        .unwrap_or(bytes);
    String::from_utf8_lossy(trimmed).trim_matches('\t').to_string()
}

pub(crate) fn write_fixed_string<W: Write>(writer: &mut W, s: &str, len: usize) -> Result<()> {
    let mut buf = vec![0u8; len];
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    buf[..n].copy_from_slice(&bytes[..n]);
    writer.write_all(&buf).map_err(TrajLogError::Io)
}

/// Everything the native and compressed formats carry in common, minus the version number
/// (each format frames that differently around this block).
pub(crate) struct LogCore {
    pub sampling_interval_ms: i32,
    pub axes_sampled: Vec<AxisKind>,
    pub samples_per_axis: Vec<i32>,
    pub axis_scale: AxisScale,
    pub num_sub_beams: i32,
    pub is_truncated: bool,
    pub num_snapshots: i32,
    pub mlc_model: MlcModel,
    pub metadata: MetaData,
    pub sub_beams: Vec<SubBeam>,
}

pub(crate) fn read_log_core<R: Read>(reader: &mut R) -> Result<LogCore> {
    let sampling_interval_ms = read_i32(reader)?;

    let num_axes_sampled = read_i32(reader)?;
    if !(0..=1000).contains(&num_axes_sampled) {
        return Err(TrajLogError::InvalidFormat(
            "NumAxesSampled out of range [0, 1000]".into(),
        ));
    }
    let num_axes_sampled = num_axes_sampled as usize;

    let mut axes_sampled = Vec::with_capacity(num_axes_sampled);
    for _ in 0..num_axes_sampled {
        axes_sampled.push(AxisKind::from_code(read_i32(reader)?)?);
    }
    let mut samples_per_axis = Vec::with_capacity(num_axes_sampled);
    for _ in 0..num_axes_sampled {
        samples_per_axis.push(read_i32(reader)?);
    }

    let axis_scale = AxisScale::from_code(read_i32(reader)?)?;

    let num_sub_beams = read_i32(reader)?;
    if !(0..=10_000).contains(&num_sub_beams) {
        return Err(TrajLogError::InvalidFormat(
            "NumberOfSubBeams out of range [0, 10_000]".into(),
        ));
    }

    let is_truncated = read_i32(reader)? != 0;

    let num_snapshots = read_i32(reader)?;
    if !(0..=10_000_000).contains(&num_snapshots) {
        return Err(TrajLogError::InvalidFormat(
            "NumberOfSnapshots out of range [0, 10_000_000]".into(),
        ));
    }

    let mlc_model = MlcModel::from_code(read_i32(reader)?)?;

    let metadata_bytes = read_bytes(reader, METADATA_LEN)?;
    let metadata = MetaData::parse(&decode_fixed_string(&metadata_bytes));

    let mut sub_beams = Vec::with_capacity(num_sub_beams as usize);
    for _ in 0..num_sub_beams {
        let control_point = read_i32(reader)?;
        let delivered_mu = read_f32(reader)?;
        let expected_rad_time = read_f32(reader)?;
        let sequence_number = read_i32(reader)?;
        let name_bytes = read_bytes(reader, SUBBEAM_NAME_LEN)?;
        let _reserved = read_bytes(reader, SUBBEAM_RESERVED)?;
        sub_beams.push(SubBeam {
            control_point,
            delivered_mu,
            expected_rad_time,
            sequence_number,
            name: decode_fixed_string(&name_bytes),
        });
    }

    Ok(LogCore {
        sampling_interval_ms,
        axes_sampled,
        samples_per_axis,
        axis_scale,
        num_sub_beams,
        is_truncated,
        num_snapshots,
        mlc_model,
        metadata,
        sub_beams,
    })
}

pub(crate) fn write_log_core<W: Write>(
    writer: &mut W,
    header: &Header,
    metadata: &MetaData,
    sub_beams: &[SubBeam],
) -> Result<()> {
    write_i32(writer, header.sampling_interval_ms)?;
    write_i32(writer, header.axes_sampled.len() as i32)?;
    for kind in &header.axes_sampled {
        write_i32(writer, kind.code())?;
    }
    for &stride in &header.samples_per_axis {
        write_i32(writer, stride)?;
    }
    write_i32(writer, header.axis_scale.code())?;
    write_i32(writer, header.num_sub_beams)?;
    write_i32(writer, header.is_truncated as i32)?;
    write_i32(writer, header.num_snapshots)?;
    write_i32(writer, header.mlc_model.code())?;

    write_fixed_string(writer, &metadata.render(), METADATA_LEN)?;

    for sub_beam in sub_beams {
        write_i32(writer, sub_beam.control_point)?;
        write_f32(writer, sub_beam.delivered_mu)?;
        write_f32(writer, sub_beam.expected_rad_time)?;
        write_i32(writer, sub_beam.sequence_number)?;
        write_fixed_string(writer, &sub_beam.name, SUBBEAM_NAME_LEN)?;
        writer
            .write_all(&vec![0u8; SUBBEAM_RESERVED])
            .map_err(TrajLogError::Io)?;
    }

    Ok(())
}
