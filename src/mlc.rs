/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! MLC leaf geometry and the `IFieldData` projection from a `TrajectoryLog` snapshot.
//!
//! Leaf width/center-Y schedules below are a modeled approximation of the Varian Millennium
//! 80/120/120HD leaf banks (narrower leaves near the central axis, wider toward the field
//! edge); see DESIGN.md for the exact numbers used and why they're approximate.

use crate::error::Result;
use crate::header::MlcModel;
use crate::log::TrajectoryLog;
use crate::views::MlcSnapshot;

/// Per-pair leaf width (mm) and center-Y (mm), indexed bottom-to-top.
pub struct LeafGeometry {
    widths: Vec<f64>,
    centers: Vec<f64>,
}

impl LeafGeometry {
    pub fn for_model(model: MlcModel) -> Self {
        let widths = match model {
            MlcModel::Nds80 => vec![10.0; 40],
            MlcModel::Nds120 => leaf_width_schedule(10, 10.0, 20, 5.0),
            MlcModel::Nds120Hd => leaf_width_schedule(16, 5.0, 14, 2.5),
        };
        Self::from_widths(widths)
    }

    fn from_widths(widths: Vec<f64>) -> Self {
        let total: f64 = widths.iter().sum();
        let mut y = -total / 2.0;
        let mut centers = Vec::with_capacity(widths.len());
        for &w in &widths {
            centers.push(y + w / 2.0);
            y += w;
        }
        LeafGeometry { widths, centers }
    }

    pub fn leaf_width(&self, pair: usize) -> f64 {
        self.widths[pair]
    }

    pub fn center_y(&self, pair: usize) -> f64 {
        self.centers[pair]
    }

    pub fn num_leaf_pairs(&self) -> usize {
        self.widths.len()
    }
}

/// Builds a bottom-to-top width schedule: `outer_pairs` wide leaves, `inner_pairs` narrow
/// leaves, mirrored (`outer inner inner outer`), so the narrow leaves sit astride the
/// central axis.
fn leaf_width_schedule(outer_pairs: usize, outer_w: f64, inner_pairs: usize, inner_w: f64) -> Vec<f64> {
    let mut widths = Vec::with_capacity(2 * (outer_pairs + inner_pairs));
    widths.extend(std::iter::repeat(outer_w).take(outer_pairs));
    widths.extend(std::iter::repeat(inner_w).take(inner_pairs));
    widths.extend(std::iter::repeat(inner_w).take(inner_pairs));
    widths.extend(std::iter::repeat(outer_w).take(outer_pairs));
    widths
}

/// One delivered field state, in mm at isocenter, as consumed by the fluence engine (§4.4).
/// Two concrete implementations exist: `SnapshotFieldData` (trajectory-log snapshots, fully
/// implemented) and, out of scope here, a DICOM RT-Plan-to-field adapter that only this
/// trait's shape is specified for.
pub trait IFieldData {
    fn jaws(&self) -> (f32, f32, f32, f32); // x1, y1, x2, y2
    fn gantry_deg(&self) -> f32;
    fn collimator_deg(&self) -> f32;
    fn leaf_mm(&self, bank: usize, index: usize) -> f32;
    fn delta_mu(&self) -> f32;
    fn beam_hold(&self) -> bool;
    fn mlc_model(&self) -> MlcModel;
}

/// Projects one `TrajectoryLog` snapshot into `IFieldData`, borrowing the log.
pub struct SnapshotFieldData<'a> {
    log: &'a TrajectoryLog,
    snapshot: i32,
    prev_mu_actual: f32,
}

impl<'a> SnapshotFieldData<'a> {
    pub fn new(log: &'a TrajectoryLog, snapshot: i32) -> Result<Self> {
        use crate::header::AxisKind;
        use crate::views::ScalarColumn;

        let prev_mu_actual = if snapshot == 0 {
            0.0
        } else {
            ScalarColumn::new(log, AxisKind::Mu)?.actual(snapshot - 1)
        };

        Ok(SnapshotFieldData {
            log,
            snapshot,
            prev_mu_actual,
        })
    }

    fn mlc(&self) -> MlcSnapshot<'a> {
        MlcSnapshot::new(self.log, self.snapshot).expect("log validated to carry an MLC axis")
    }

    fn scalar_actual(&self, kind: crate::header::AxisKind) -> f32 {
        crate::views::ScalarColumn::new(self.log, kind)
            .expect("axis present")
            .actual(self.snapshot)
    }
}

impl<'a> IFieldData for SnapshotFieldData<'a> {
    fn jaws(&self) -> (f32, f32, f32, f32) {
        use crate::header::AxisKind;
        (
            self.scalar_actual(AxisKind::CollX1),
            self.scalar_actual(AxisKind::CollY1),
            self.scalar_actual(AxisKind::CollX2),
            self.scalar_actual(AxisKind::CollY2),
        )
    }

    fn gantry_deg(&self) -> f32 {
        self.scalar_actual(crate::header::AxisKind::GantryRtn)
    }

    fn collimator_deg(&self) -> f32 {
        self.scalar_actual(crate::header::AxisKind::CollRtn)
    }

    fn leaf_mm(&self, bank: usize, index: usize) -> f32 {
        self.mlc().leaf_actual(bank, index)
    }

    fn delta_mu(&self) -> f32 {
        let mu = self.scalar_actual(crate::header::AxisKind::Mu);
        (mu - self.prev_mu_actual).max(0.0)
    }

    fn beam_hold(&self) -> bool {
        self.scalar_actual(crate::header::AxisKind::BeamHold) != 0.0
    }

    fn mlc_model(&self) -> MlcModel {
        self.log.header.mlc_model
    }
}

/// Out-of-scope collaborator: a DICOM RT-Plan control point projected into `IFieldData`.
/// This crate defines only the trait boundary; no DICOM parsing lives here.
pub trait PlanFieldData: IFieldData {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nds80_uniform_width() {
        let geom = LeafGeometry::for_model(MlcModel::Nds80);
        assert_eq!(geom.num_leaf_pairs(), 40);
        for i in 0..40 {
            assert_eq!(geom.leaf_width(i), 10.0);
        }
        assert!((geom.center_y(0) + 195.0).abs() < 1e-9);
        assert!((geom.center_y(39) - 195.0).abs() < 1e-9);
    }

    #[test]
    fn nds120_symmetric_centers() {
        let geom = LeafGeometry::for_model(MlcModel::Nds120);
        assert_eq!(geom.num_leaf_pairs(), 60);
        for i in 0..30 {
            assert!((geom.center_y(i) + geom.center_y(59 - i)).abs() < 1e-9);
        }
    }
}
