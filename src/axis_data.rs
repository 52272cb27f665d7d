/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

use crate::error::{Result, TrajLogError};
use crate::header::AxisKind;

/// Stride-major flat sample buffer for one axis: `len() == num_snapshots * stride`.
/// Row-major `snapshot * stride + offset` addressing is canonical (§3 invariant).
#[derive(Debug, Clone)]
pub struct AxisData {
    kind: AxisKind,
    stride: i32,
    num_snapshots: i32,
    samples: Vec<f32>,
}

impl AxisData {
    pub fn new(kind: AxisKind, stride: i32, num_snapshots: i32, samples: Vec<f32>) -> Result<Self> {
        let expected_len = stride as usize * num_snapshots as usize;
        if samples.len() != expected_len {
            return Err(TrajLogError::InvalidOperation(format!(
                "axis {:?}: expected {} samples, got {}",
                kind,
                expected_len,
                samples.len()
            )));
        }
        Ok(AxisData {
            kind,
            stride,
            num_snapshots,
            samples,
        })
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn stride(&self) -> i32 {
        self.stride
    }

    pub fn num_snapshots(&self) -> i32 {
        self.num_snapshots
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    #[inline]
    pub fn at(&self, snapshot: i32, offset: i32) -> f32 {
        self.samples[(snapshot * self.stride + offset) as usize]
    }

    #[inline]
    pub fn set(&mut self, snapshot: i32, offset: i32, value: f32) {
        self.samples[(snapshot * self.stride + offset) as usize] = value;
    }

    /// Expected/actual pair for a scalar axis (`stride == 2`).
    pub fn scalar(&self, snapshot: i32) -> (f32, f32) {
        (self.at(snapshot, 0), self.at(snapshot, 1))
    }

    /// Offset of a leaf's expected (`which = 0`) or actual (`which = 1`) position within
    /// the MLC row: 4 carriage values, then bank 0 leaves, then bank 1 leaves, leaf-minor.
    pub fn mlc_leaf_offset(num_leaf_pairs: usize, bank: usize, leaf: usize, which: usize) -> i32 {
        (4 + (bank * num_leaf_pairs + leaf) * 2 + which) as i32
    }
}
