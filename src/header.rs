/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

use crate::error::{Result, TrajLogError};

/// One sampled channel of the trajectory log. Order matches `Header::axes_sampled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AxisKind {
    CollX1 = 0,
    CollX2 = 1,
    CollY1 = 2,
    CollY2 = 3,
    CollRtn = 4,
    GantryRtn = 5,
    CouchVrt = 6,
    CouchLng = 7,
    CouchLat = 8,
    CouchRtn = 9,
    CouchPit = 10,
    CouchRol = 11,
    Mu = 12,
    BeamHold = 13,
    ControlPoint = 14,
    Mlc = 15,
}

impl AxisKind {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => AxisKind::CollX1,
            1 => AxisKind::CollX2,
            2 => AxisKind::CollY1,
            3 => AxisKind::CollY2,
            4 => AxisKind::CollRtn,
            5 => AxisKind::GantryRtn,
            6 => AxisKind::CouchVrt,
            7 => AxisKind::CouchLng,
            8 => AxisKind::CouchLat,
            9 => AxisKind::CouchRtn,
            10 => AxisKind::CouchPit,
            11 => AxisKind::CouchRol,
            12 => AxisKind::Mu,
            13 => AxisKind::BeamHold,
            14 => AxisKind::ControlPoint,
            15 => AxisKind::Mlc,
            other => {
                return Err(TrajLogError::InvalidFormat(format!(
                    "unknown axis code {other}"
                )))
            }
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Axes whose value wraps modulo 360 degrees and need shortest-arc handling.
    pub fn is_full_rotation(self) -> bool {
        matches!(
            self,
            AxisKind::GantryRtn | AxisKind::CollRtn | AxisKind::CouchRtn
        )
    }

    /// Large streams get 32-bit base / 16-bit delta quantization; everything else is small.
    pub fn is_large_stream(self) -> bool {
        matches!(
            self,
            AxisKind::CouchVrt
                | AxisKind::CouchLng
                | AxisKind::CouchLat
                | AxisKind::Mu
                | AxisKind::ControlPoint
                | AxisKind::GantryRtn
                | AxisKind::CollRtn
                | AxisKind::CouchRtn
        )
    }
}

/// Number of `f32` samples per snapshot for a scalar (non-MLC) axis.
pub const SCALAR_SAMPLES_PER_SNAPSHOT: i32 = 2;

/// The coordinate-sign convention the machine reported positions under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AxisScale {
    MachineScale = 0,
    ModifiedIec61217 = 1,
    MachineScaleIsocentric = 2,
}

impl AxisScale {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => AxisScale::MachineScale,
            1 => AxisScale::ModifiedIec61217,
            2 => AxisScale::MachineScaleIsocentric,
            other => {
                return Err(TrajLogError::InvalidFormat(format!(
                    "unknown axis scale {other}"
                )))
            }
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// MLC hardware model: determines leaf-pair count and the leaf-width schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MlcModel {
    Nds80 = 0,
    Nds120 = 1,
    Nds120Hd = 2,
}

impl MlcModel {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => MlcModel::Nds80,
            1 => MlcModel::Nds120,
            2 => MlcModel::Nds120Hd,
            other => {
                return Err(TrajLogError::InvalidFormat(format!(
                    "unknown MLC model {other}"
                )))
            }
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn num_leaf_pairs(self) -> usize {
        match self {
            MlcModel::Nds80 => 40,
            MlcModel::Nds120 | MlcModel::Nds120Hd => 60,
        }
    }

    /// `samples_per_snapshot` for the MLC axis: 4 carriage values plus alternating
    /// expected/actual leaf positions, bank-major, leaf index inner.
    pub fn mlc_stride(self) -> i32 {
        ((self.num_leaf_pairs() as i32) * 2 + 2) * 2
    }
}

/// Free-text metadata carried in the native log's 745-byte block.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    pub patient_id: String,
    pub plan_name: String,
    pub plan_uid: String,
    pub original_mu: String,
    pub remaining_mu: String,
    pub energy: String,
    pub beam_name: String,
}

impl MetaData {
    /// Parses CRLF-delimited `key:value` lines. Unknown keys are ignored.
    pub fn parse(text: &str) -> Self {
        let mut meta = MetaData::default();
        for line in text.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "PatientID" => meta.patient_id = value,
                "PlanName" => meta.plan_name = value,
                "PlanUID" => meta.plan_uid = value,
                "OriginalMU" => meta.original_mu = value,
                "RemainingMU" => meta.remaining_mu = value,
                "Energy" => meta.energy = value,
                "BeamName" => meta.beam_name = value,
                _ => {}
            }
        }
        meta
    }

    /// Serializes back to the CRLF `key:value` form used on disk.
    pub fn render(&self) -> String {
        format!(
            "PatientID:{}\r\nPlanName:{}\r\nPlanUID:{}\r\nOriginalMU:{}\r\nRemainingMU:{}\r\nEnergy:{}\r\nBeamName:{}\r\n",
            self.patient_id,
            self.plan_name,
            self.plan_uid,
            self.original_mu,
            self.remaining_mu,
            self.energy,
            self.beam_name,
        )
    }
}

/// Fixed-size native-log header. Validated at parse time; see `crate::codec::native`.
#[derive(Debug, Clone)]
pub struct Header {
    pub version: f64,
    pub sampling_interval_ms: i32,
    pub num_snapshots: i32,
    pub axes_sampled: Vec<AxisKind>,
    pub samples_per_axis: Vec<i32>,
    pub axis_scale: AxisScale,
    pub num_sub_beams: i32,
    pub is_truncated: bool,
    pub mlc_model: MlcModel,
}

impl Header {
    pub fn validate(&self) -> Result<()> {
        if self.axes_sampled.len() != self.samples_per_axis.len() {
            return Err(TrajLogError::InvalidOperation(
                "axes_sampled and samples_per_axis length mismatch".into(),
            ));
        }
        if !(0..=1000).contains(&(self.axes_sampled.len() as i64)) {
            return Err(TrajLogError::InvalidFormat(
                "NumAxesSampled out of range [0, 1000]".into(),
            ));
        }
        if !(0..=10_000_000).contains(&(self.num_snapshots as i64)) {
            return Err(TrajLogError::InvalidFormat(
                "NumberOfSnapshots out of range [0, 10_000_000]".into(),
            ));
        }
        if !(0..=10_000).contains(&(self.num_sub_beams as i64)) {
            return Err(TrajLogError::InvalidFormat(
                "NumberOfSubBeams out of range [0, 10_000]".into(),
            ));
        }
        Ok(())
    }

    /// Stride (samples-per-snapshot) of the axis at `index` in `axes_sampled`.
    pub fn stride_of(&self, index: usize) -> i32 {
        self.samples_per_axis[index]
    }
}
