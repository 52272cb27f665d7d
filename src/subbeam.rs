/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

/// One control-point segment of a delivered beam. Totally ordered by `sequence_number`;
/// its snapshot range is derived lazily (see `TrajectoryLog::sub_beam_range`) rather than
/// stored, since it's a pure function of the `ControlPoint` axis.
#[derive(Debug, Clone)]
pub struct SubBeam {
    pub control_point: i32,
    pub delivered_mu: f32,
    pub expected_rad_time: f32,
    pub sequence_number: i32,
    pub name: String,
}

/// Derived snapshot range for a sub-beam, or `NotStarted` if its control point was never
/// reached in the recorded snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBeamRange {
    Started { start: i32, end: i32 },
    NotStarted,
}
