/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Lazy column (by-axis) and row (by-snapshot) adapters over a `TrajectoryLog`. These are
//! value types that project into the log's flat buffers on access rather than caching
//! per-view objects (§9 design note); `GetDelta` composition is built on top of a small
//! `ValueSeries` trait so acceleration (a delta of a delta) falls out of the same code path
//! as velocity.

use crate::error::{Result, TrajLogError};
use crate::header::{AxisKind, AxisScale};
use crate::log::TrajectoryLog;
use crate::scale::{self, shortest_arc_delta};

/// `{expected, actual, error}` for one axis at one snapshot, where `error` is the
/// scale-aware delta from expected to actual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRecord {
    pub expected: f32,
    pub actual: f32,
    pub error: f32,
    axis: AxisKind,
    scale: AxisScale,
}

impl ScalarRecord {
    fn new(axis: AxisKind, scale: AxisScale, expected: f32, actual: f32) -> Self {
        let error = scale::delta(scale, expected as f64, scale, actual as f64, axis) as f32;
        ScalarRecord {
            expected,
            actual,
            error,
            axis,
            scale,
        }
    }

    /// Converts both fields into `target_scale`, recomputing `error` in that scale.
    pub fn with_scale(&self, target_scale: AxisScale) -> ScalarRecord {
        let expected = scale::convert(self.scale, target_scale, self.axis, self.expected as f64) as f32;
        let actual = scale::convert(self.scale, target_scale, self.axis, self.actual as f64) as f32;
        ScalarRecord::new(self.axis, target_scale, expected, actual)
    }

    pub fn axis(&self) -> AxisKind {
        self.axis
    }
}

/// A lazily-projected per-axis time series. Implemented by `ScalarColumn` (a log axis's
/// actual readings) and by `DeltaColumn` (a derivative of any `ValueSeries`), so chaining
/// `get_delta` twice yields acceleration without any intermediate allocation.
pub trait ValueSeries {
    fn len(&self) -> i32;
    fn value(&self, index: i32) -> f32;
    fn axis(&self) -> AxisKind;
    fn sampling_interval_ms(&self) -> i32;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `GetDelta(dt)`: value at `i` is `(x[i] - x[i-1]) * dt_ms / sampling_interval_ms`,
    /// shortest-arc wrapped for full-rotation axes; index 0 is always 0.
    fn get_delta(&self, dt_ms: f64) -> DeltaColumn<Self>
    where
        Self: Sized + Clone,
    {
        DeltaColumn {
            inner: self.clone(),
            dt_ms,
        }
    }
}

/// Lazy column view over one axis's `actual` readings across every snapshot.
#[derive(Clone, Copy)]
pub struct ScalarColumn<'a> {
    log: &'a TrajectoryLog,
    axis_index: usize,
}

impl<'a> ScalarColumn<'a> {
    pub fn new(log: &'a TrajectoryLog, kind: AxisKind) -> Result<Self> {
        let axis_index = log.axis_index(kind).ok_or_else(|| {
            TrajLogError::InvalidOperation(format!("log has no {kind:?} axis"))
        })?;
        if kind == AxisKind::Mlc {
            return Err(TrajLogError::InvalidOperation(
                "ScalarColumn does not support the MLC axis; use MlcColumn".into(),
            ));
        }
        Ok(ScalarColumn { log, axis_index })
    }

    pub fn expected(&self, index: i32) -> f32 {
        self.log.axes()[self.axis_index].at(index, 0)
    }

    pub fn actual(&self, index: i32) -> f32 {
        self.log.axes()[self.axis_index].at(index, 1)
    }

    pub fn record(&self, index: i32) -> ScalarRecord {
        ScalarRecord::new(
            self.axis(),
            self.log.header.axis_scale,
            self.expected(index),
            self.actual(index),
        )
    }
}

impl<'a> ValueSeries for ScalarColumn<'a> {
    fn len(&self) -> i32 {
        self.log.axes()[self.axis_index].num_snapshots()
    }

    fn value(&self, index: i32) -> f32 {
        self.actual(index)
    }

    fn axis(&self) -> AxisKind {
        self.log.axes()[self.axis_index].kind()
    }

    fn sampling_interval_ms(&self) -> i32 {
        self.log.header.sampling_interval_ms
    }
}

/// The derivative of any `ValueSeries` with respect to `dt_ms`. Chaining another
/// `get_delta` over this yields the second derivative.
#[derive(Clone)]
pub struct DeltaColumn<S> {
    inner: S,
    dt_ms: f64,
}

impl<S: ValueSeries + Clone> ValueSeries for DeltaColumn<S> {
    fn len(&self) -> i32 {
        self.inner.len()
    }

    fn value(&self, index: i32) -> f32 {
        if index == 0 {
            return 0.0;
        }
        let prev = self.inner.value(index - 1) as f64;
        let cur = self.inner.value(index) as f64;
        let raw_delta = if self.inner.axis().is_full_rotation() {
            shortest_arc_delta(prev, cur)
        } else {
            cur - prev
        };
        (raw_delta * self.dt_ms / f64::from(self.inner.sampling_interval_ms())) as f32
    }

    fn axis(&self) -> AxisKind {
        self.inner.axis()
    }

    fn sampling_interval_ms(&self) -> i32 {
        self.inner.sampling_interval_ms()
    }
}

/// One snapshot's MLC state: 4 carriage values plus per-leaf expected/actual, bank-major.
pub struct MlcSnapshot<'a> {
    log: &'a TrajectoryLog,
    snapshot: i32,
    num_leaf_pairs: usize,
}

impl<'a> MlcSnapshot<'a> {
    pub fn new(log: &'a TrajectoryLog, snapshot: i32) -> Result<Self> {
        log.axis_index(AxisKind::Mlc).ok_or_else(|| {
            TrajLogError::InvalidOperation("log has no MLC axis".into())
        })?;
        Ok(MlcSnapshot {
            log,
            snapshot,
            num_leaf_pairs: log.header.mlc_model.num_leaf_pairs(),
        })
    }

    fn axis(&self) -> &crate::axis_data::AxisData {
        self.log.mlc_axis().expect("validated in new()")
    }

    pub fn carriage(&self, index: usize) -> (f32, f32) {
        debug_assert!(index < 2);
        let axis = self.axis();
        (
            axis.at(self.snapshot, index as i32),
            axis.at(self.snapshot, 2 + index as i32),
        )
    }

    pub fn leaf_expected(&self, bank: usize, leaf: usize) -> f32 {
        let offset = crate::axis_data::AxisData::mlc_leaf_offset(self.num_leaf_pairs, bank, leaf, 0);
        self.axis().at(self.snapshot, offset)
    }

    pub fn leaf_actual(&self, bank: usize, leaf: usize) -> f32 {
        let offset = crate::axis_data::AxisData::mlc_leaf_offset(self.num_leaf_pairs, bank, leaf, 1);
        self.axis().at(self.snapshot, offset)
    }

    pub fn num_leaf_pairs(&self) -> usize {
        self.num_leaf_pairs
    }
}

/// Row view over one snapshot: a `ScalarRecord` per scalar axis plus the `MlcSnapshot`.
pub struct SnapshotView<'a> {
    log: &'a TrajectoryLog,
    snapshot: i32,
}

impl<'a> SnapshotView<'a> {
    pub fn new(log: &'a TrajectoryLog, snapshot: i32) -> Self {
        SnapshotView { log, snapshot }
    }

    pub fn scalar(&self, kind: AxisKind) -> Result<ScalarRecord> {
        if kind == AxisKind::Mlc {
            return Err(TrajLogError::InvalidOperation(
                "requested ScalarRecord for the MLC axis".into(),
            ));
        }
        Ok(ScalarColumn::new(self.log, kind)?.record(self.snapshot))
    }

    pub fn mlc(&self) -> Result<MlcSnapshot<'a>> {
        MlcSnapshot::new(self.log, self.snapshot)
    }

    pub fn index(&self) -> i32 {
        self.snapshot
    }
}

/// MU/min instantaneous dose rate: the MU axis's delta evaluated with a one-minute `dt`.
pub fn dose_rate(log: &TrajectoryLog) -> Result<DeltaColumn<ScalarColumn<'_>>> {
    Ok(ScalarColumn::new(log, AxisKind::Mu)?.get_delta(60_000.0))
}

/// Sum of a jaw pair's two columns (`X1+X2` or `Y1+Y2`), the jaw-separation aggregate used
/// by field-size reporting. Not itself a `ValueSeries` since the field aggregates over two
/// distinct axes, but exposes `actual`/`expected`/`get_delta` with the same semantics.
pub struct JawPair<'a> {
    a: ScalarColumn<'a>,
    b: ScalarColumn<'a>,
}

impl<'a> JawPair<'a> {
    pub fn x(log: &'a TrajectoryLog) -> Result<Self> {
        Ok(JawPair {
            a: ScalarColumn::new(log, AxisKind::CollX1)?,
            b: ScalarColumn::new(log, AxisKind::CollX2)?,
        })
    }

    pub fn y(log: &'a TrajectoryLog) -> Result<Self> {
        Ok(JawPair {
            a: ScalarColumn::new(log, AxisKind::CollY1)?,
            b: ScalarColumn::new(log, AxisKind::CollY2)?,
        })
    }

    pub fn expected(&self, index: i32) -> f32 {
        self.a.expected(index) + self.b.expected(index)
    }

    pub fn actual(&self, index: i32) -> f32 {
        self.a.actual(index) + self.b.actual(index)
    }

    /// `GetDelta(dt)` on the summed series: `(actual[i] - actual[i-1]) * dt_ms / interval_ms`.
    pub fn delta(&self, index: i32, dt_ms: f64) -> f32 {
        if index == 0 {
            return 0.0;
        }
        let prev = self.actual(index - 1) as f64;
        let cur = self.actual(index) as f64;
        ((cur - prev) * dt_ms / f64::from(self.a.sampling_interval_ms())) as f32
    }
}
