/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

use serde::{Deserialize, Serialize};

/// Configuration for `reconstruct` (§4.4/§6). The mm-based `width`/`height` form is
/// preferred; legacy `GridSizeXInCm`/`GridSizeYInCm`/`UseGzip` fields some source trees carry
/// are intentionally not modeled here (documented compatibility shim only, per the Open
/// Questions in spec.md §9 — a host that needs them converts cm to mm before constructing
/// this struct).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FluenceOptions {
    pub cols: i32,
    pub rows: i32,
    /// Grid width in mm, or `-1.0` to auto-size from the delivered jaw extents.
    pub width: f64,
    /// Grid height in mm, or `-1.0` to auto-size from the delivered jaw extents.
    pub height: f64,
    pub margin: f64,
    pub min_delta_mu: f32,
    pub use_approximate_fluence: bool,
    pub fixed_collimator_angle: Option<f32>,
    pub max_parallelism: usize,
    pub exclude_beam_holds: bool,
}

impl Default for FluenceOptions {
    fn default() -> Self {
        FluenceOptions {
            cols: 100,
            rows: 100,
            width: -1.0,
            height: -1.0,
            margin: 10.0,
            min_delta_mu: 1e-4,
            use_approximate_fluence: false,
            fixed_collimator_angle: None,
            max_parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            exclude_beam_holds: false,
        }
    }
}
