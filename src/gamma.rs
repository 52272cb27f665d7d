/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! gamma (γ) index comparison between two fluence grids (§4.5): supersampled reference
//! resampling, an offset-table search radius precomputed once per parameter set, and
//! global/local dose normalization.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, TrajLogError};
use crate::grid::GridF;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GammaParameters2D {
    pub dta_tol_mm: f64,
    pub dose_tol_percent: f64,
    pub global: bool,
    pub threshold_percent: f64,
    pub sampling_rate: u32,
}

impl Default for GammaParameters2D {
    fn default() -> Self {
        GammaParameters2D {
            dta_tol_mm: 3.0,
            dose_tol_percent: 3.0,
            global: true,
            threshold_percent: 10.0,
            sampling_rate: 5,
        }
    }
}

impl GammaParameters2D {
    pub fn validate(&self) -> Result<()> {
        if self.dta_tol_mm < 0.1 {
            return Err(TrajLogError::OutOfRange(
                "dta_tol_mm must be >= 0.1 mm".into(),
            ));
        }
        if self.sampling_rate == 0 || self.sampling_rate > 10 {
            return Err(TrajLogError::OutOfRange(
                "sampling_rate must be in [1, 10]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GammaResult2D {
    pub params: GammaParameters2D,
    pub frac_pass: f64,
    pub gamma_map: Vec<f64>,
    pub cols: i32,
    pub rows: i32,
}

/// Sentinel written to un-evaluated pixels (below the dose threshold).
pub const UNEVALUATED: f64 = -1.0;

impl GammaResult2D {
    /// Median gamma value, excluding the `-1` sentinel for un-evaluated pixels.
    pub fn median(&self) -> Option<f64> {
        let mut values: Vec<f64> = self
            .gamma_map
            .iter()
            .cloned()
            .filter(|&v| v != UNEVALUATED)
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = values.len() / 2;
        Some(if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Offset {
    dx: i32,
    dy: i32,
    dist_sq: f64,
}

fn build_offset_table(
    dta_tol_mm: f64,
    sampling_rate: u32,
    compared_x_res: f64,
    compared_y_res: f64,
) -> (i32, i32, Vec<Offset>) {
    let search_res_target = dta_tol_mm / sampling_rate as f64;
    let mx = (compared_x_res / search_res_target).ceil().max(1.0) as i32;
    let my = (compared_y_res / search_res_target).ceil().max(1.0) as i32;
    let x_search_res = compared_x_res / mx as f64;
    let y_search_res = compared_y_res / my as f64;

    let search_radius = 1.5 * dta_tol_mm;
    let search_radius_sq = search_radius * search_radius;
    let max_i = (search_radius / x_search_res).ceil() as i32;
    let max_j = (search_radius / y_search_res).ceil() as i32;

    let mut offsets = Vec::new();
    for i in -max_i..=max_i {
        for j in -max_j..=max_j {
            let dist_sq = (i as f64 * x_search_res).powi(2) + (j as f64 * y_search_res).powi(2);
            if dist_sq <= search_radius_sq {
                offsets.push(Offset { dx: i, dy: j, dist_sq });
            }
        }
    }
    offsets.sort_by(|a, b| a.dist_sq.partial_cmp(&b.dist_sq).unwrap());

    (mx, my, offsets)
}

fn bilinear_sample(grid: &GridF, wx: f64, wy: f64) -> f32 {
    let (fc, fr) = grid.world_to_grid(wx, wy);
    let fc = fc - 0.5;
    let fr = fr - 0.5;
    let c0 = fc.floor();
    let r0 = fr.floor();
    let tc = fc - c0;
    let tr = fr - r0;
    let c0i = c0 as i32;
    let r0i = r0 as i32;

    let sample = |c: i32, r: i32| -> f64 {
        let c = c.clamp(0, grid.cols() - 1);
        let r = r.clamp(0, grid.rows() - 1);
        grid.get(c, r) as f64
    };

    let v00 = sample(c0i, r0i);
    let v10 = sample(c0i + 1, r0i);
    let v01 = sample(c0i, r0i + 1);
    let v11 = sample(c0i + 1, r0i + 1);

    let v0 = v00 * (1.0 - tc) + v10 * tc;
    let v1 = v01 * (1.0 - tc) + v11 * tc;
    (v0 * (1.0 - tr) + v1 * tr) as f32 as f64
}

/// Resamples `reference` onto a lattice that lines up exactly with `compared`'s pixels at
/// `mx`/`my`-fold finer resolution (§4.5 step 1).
fn supersample_reference(reference: &GridF, compared: &GridF, mx: i32, my: i32) -> GridF {
    let cols = (mx - 1) * (compared.cols() - 1) + compared.cols();
    let rows = (my - 1) * (compared.rows() - 1) + compared.rows();
    let mut out = GridF::new(compared.x, compared.y, compared.width, compared.height, cols, rows);
    for row in 0..rows {
        for col in 0..cols {
            let (wx, wy) = out.pixel_center(col, row);
            out.set(col, row, bilinear_sample(reference, wx, wy) as f32);
        }
    }
    out
}

/// Caches the offset table across calls that share `(dta_tol, sampling_rate, comparedRes)`,
/// per the design note in spec §9.
#[derive(Default)]
pub struct GammaEngine {
    offset_cache: Mutex<HashMap<(u64, u32, u64, u64), (i32, i32, Vec<Offset>)>>,
}

impl GammaEngine {
    pub fn new() -> Self {
        GammaEngine::default()
    }

    fn offsets_for(
        &self,
        dta_tol_mm: f64,
        sampling_rate: u32,
        compared_x_res: f64,
        compared_y_res: f64,
    ) -> (i32, i32, Vec<Offset>) {
        let key = (
            dta_tol_mm.to_bits(),
            sampling_rate,
            compared_x_res.to_bits(),
            compared_y_res.to_bits(),
        );
        let mut cache = self.offset_cache.lock().unwrap();
        cache
            .entry(key)
            .or_insert_with(|| {
                build_offset_table(dta_tol_mm, sampling_rate, compared_x_res, compared_y_res)
            })
            .clone()
    }

    pub fn calculate(
        &self,
        params: &GammaParameters2D,
        reference: &GridF,
        compared: &GridF,
    ) -> Result<GammaResult2D> {
        params.validate()?;

        let (mx, my, offsets) = self.offsets_for(
            params.dta_tol_mm,
            params.sampling_rate,
            compared.x_res(),
            compared.y_res(),
        );
        let supersampled = supersample_reference(reference, compared, mx, my);

        let compared_max = compared.max() as f64;
        let threshold = params.threshold_percent / 100.0 * compared_max;

        let cols = compared.cols();
        let rows = compared.rows();
        let mut gamma_map = vec![UNEVALUATED; (cols * rows) as usize];
        let mut pass = 0usize;
        let mut evaluated = 0usize;

        for yi in 0..rows {
            for xi in 0..cols {
                let d_compared = compared.get(xi, yi) as f64;
                if d_compared < threshold {
                    continue;
                }
                evaluated += 1;

                let mut min_gamma_sq = f64::INFINITY;
                for off in &offsets {
                    let sc = xi * mx + off.dx;
                    let sr = yi * my + off.dy;
                    if sc < 0 || sc >= supersampled.cols() || sr < 0 || sr >= supersampled.rows() {
                        continue;
                    }
                    let d_ref = supersampled.get(sc, sr) as f64;
                    let denom = if params.global { compared_max } else { d_ref };
                    if denom == 0.0 {
                        continue;
                    }
                    let dose_term = (100.0 * (d_compared - d_ref) / denom).powi(2)
                        / params.dose_tol_percent.powi(2);
                    let dist_term = off.dist_sq / (params.dta_tol_mm * params.dta_tol_mm);
                    let g2 = dose_term + dist_term;
                    if g2 < min_gamma_sq {
                        min_gamma_sq = g2;
                    }
                }

                if min_gamma_sq.is_finite() {
                    let idx = (yi * cols + xi) as usize;
                    gamma_map[idx] = min_gamma_sq.sqrt();
                    if min_gamma_sq <= 1.0 {
                        pass += 1;
                    }
                }
            }
        }

        let frac_pass = if evaluated > 0 {
            pass as f64 / evaluated as f64
        } else {
            0.0
        };

        Ok(GammaResult2D {
            params: *params,
            frac_pass,
            gamma_map,
            cols,
            rows,
        })
    }
}

/// Convenience one-shot entry point; builds a fresh, uncached `GammaEngine`. Prefer
/// `GammaEngine::calculate` directly when evaluating many grids under the same parameters.
pub fn calculate(
    params: &GammaParameters2D,
    reference: &GridF,
    compared: &GridF,
) -> Result<GammaResult2D> {
    GammaEngine::new().calculate(params, reference, compared)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_grid(cols: i32, rows: i32, value: f32) -> GridF {
        let mut g = GridF::new(-50.0, -50.0, 100.0, 100.0, cols, rows);
        for v in g.data_mut() {
            *v = value;
        }
        g
    }

    #[test]
    fn half_percent_error_yields_gamma_half() {
        let reference = constant_grid(10, 10, 100.0);
        let compared = constant_grid(10, 10, 99.5);
        let params = GammaParameters2D {
            dta_tol_mm: 1.0,
            dose_tol_percent: 1.0,
            global: true,
            threshold_percent: 10.0,
            sampling_rate: 5,
        };
        let result = calculate(&params, &reference, &compared).unwrap();
        assert_eq!(result.frac_pass, 1.0);
        for &g in &result.gamma_map {
            assert!((g - 0.5).abs() < 1e-6, "gamma {g}");
        }
    }

    #[test]
    fn global_passes_local_fails_low_dose_region() {
        let cols = 4;
        let rows = 4;
        let mut reference = GridF::new(0.0, 0.0, 40.0, 40.0, cols, rows);
        let mut compared = GridF::new(0.0, 0.0, 40.0, 40.0, cols, rows);
        for v in reference.data_mut() {
            *v = 50.0;
        }
        for v in compared.data_mut() {
            *v = 45.0;
        }
        // shared hot spot establishes a high grid max used by global normalization
        reference.set(0, 0, 1000.0);
        compared.set(0, 0, 1000.0);

        let base_params = GammaParameters2D {
            dta_tol_mm: 5.0,
            dose_tol_percent: 5.0,
            threshold_percent: 1.0,
            sampling_rate: 5,
            global: true,
        };

        let global_result = calculate(&base_params, &reference, &compared).unwrap();
        let local_result = calculate(
            &GammaParameters2D {
                global: false,
                ..base_params
            },
            &reference,
            &compared,
        )
        .unwrap();

        // pixel (3,3) is far from the hot spot and carries the 10%-local dose error
        let idx = (3 * cols + 3) as usize;
        assert!(global_result.gamma_map[idx] < 1.0, "global should pass");
        assert!(local_result.gamma_map[idx] > 1.0, "local should fail");
    }
}
