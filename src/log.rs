/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

use crate::axis_data::AxisData;
use crate::error::{Result, TrajLogError};
use crate::header::{AxisKind, Header, MetaData};
use crate::subbeam::{SubBeam, SubBeamRange};

/// Owns the header, metadata, sub-beam list and axis sample arrays for one trajectory log.
///
/// This is the arena of the "arena + indices" design (§9 of the design notes): snapshot and
/// column views never own data, they carry `(&TrajectoryLog, index)` and project into these
/// flat buffers on access, which sidesteps the snapshot→log→sub-beam→log cycle a naive
/// object-graph rendering would have.
pub struct TrajectoryLog {
    pub header: Header,
    pub metadata: MetaData,
    pub sub_beams: Vec<SubBeam>,
    axis_data: Vec<AxisData>,
}

impl TrajectoryLog {
    pub fn new(
        header: Header,
        metadata: MetaData,
        sub_beams: Vec<SubBeam>,
        axis_data: Vec<AxisData>,
    ) -> Result<Self> {
        header.validate()?;

        if axis_data.len() != header.axes_sampled.len() {
            return Err(TrajLogError::InvalidOperation(
                "axis_data length does not match header.axes_sampled".into(),
            ));
        }
        for (i, data) in axis_data.iter().enumerate() {
            if data.kind() != header.axes_sampled[i] {
                return Err(TrajLogError::InvalidOperation(format!(
                    "axis_data[{i}] kind mismatch with header"
                )));
            }
            if data.num_snapshots() != header.num_snapshots {
                return Err(TrajLogError::InvalidOperation(format!(
                    "axis_data[{i}] snapshot count mismatch with header"
                )));
            }
        }

        Ok(TrajectoryLog {
            header,
            metadata,
            sub_beams,
            axis_data,
        })
    }

    pub fn num_snapshots(&self) -> i32 {
        self.header.num_snapshots
    }

    pub fn axes(&self) -> &[AxisData] {
        &self.axis_data
    }

    /// Index of `kind` within `header.axes_sampled`, or `None` if that axis wasn't recorded.
    pub fn axis_index(&self, kind: AxisKind) -> Option<usize> {
        self.header.axes_sampled.iter().position(|&k| k == kind)
    }

    pub fn axis(&self, kind: AxisKind) -> Option<&AxisData> {
        self.axis_index(kind).map(|i| &self.axis_data[i])
    }

    pub fn mlc_axis(&self) -> Option<&AxisData> {
        self.axis(AxisKind::Mlc)
    }

    /// Derives the `[start, end]` snapshot range of `sub_beams[index]` by linear scan of the
    /// `ControlPoint` axis for the first snapshot at or past this sub-beam's control point.
    /// `end` is the next sub-beam's start minus one, or the last snapshot index.
    pub fn sub_beam_range(&self, index: usize) -> Result<SubBeamRange> {
        let cp_axis = self.axis(AxisKind::ControlPoint).ok_or_else(|| {
            TrajLogError::InvalidOperation("log has no ControlPoint axis".into())
        })?;
        let sub_beam = &self.sub_beams[index];

        let start = (0..self.num_snapshots())
            .find(|&s| cp_axis.scalar(s).1 as i32 >= sub_beam.control_point);

        let Some(start) = start else {
            return Ok(SubBeamRange::NotStarted);
        };

        let end = if index + 1 < self.sub_beams.len() {
            match self.sub_beam_range(index + 1)? {
                SubBeamRange::Started { start: next_start, .. } => next_start - 1,
                SubBeamRange::NotStarted => self.num_snapshots() - 1,
            }
        } else {
            self.num_snapshots() - 1
        };

        Ok(SubBeamRange::Started { start, end })
    }
}
