/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Text/CSV/TSV export is an out-of-scope collaborator (§1, §6): this module only fixes the
//! interface a host application implements against, not a concrete writer.

use crate::header::AxisScale;

/// One row per snapshot, `time (ms) = snapshotIndex * samplingIntervalMs` in the first
/// column, each axis's samples expanded under `Axis[i]` headers in the requested scale. The
/// trait hands back the row's column strings; the caller owns the loop over snapshots and
/// the sink (file, CSV writer, in-memory buffer) the row is written to.
pub trait TextExporter {
    fn export_row(&self, snapshot: usize, scale: AxisScale) -> Vec<String>;
}
