/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! MU-weighted accumulation of rotated-rectangle leaf apertures onto a `GridF` (§4.4).
//!
//! The spec's row-wise exact rasterizer narrows the per-row column range before clipping;
//! this implementation instead clips every pixel in the rotated aperture's bounding box,
//! which is the same result (Sutherland-Hodgman already returns zero area for pixels
//! outside the polygon) traded for simplicity over the row-range optimization — see
//! DESIGN.md. Likewise the approximate rasterizer samples the polygon boundary at each row's
//! mid-height rather than walking left/right edges as a state machine; for the convex
//! quadrilaterals this engine ever rasterizes (rotated rectangles) the two are equivalent.

use crate::clip::clip_area;
use crate::error::Result;
use crate::geometry::{Aabb, Matrix, Point, Polygon, RotatedRect};
use crate::grid::GridF;
use crate::mlc::{IFieldData, LeafGeometry};

use super::options::FluenceOptions;

/// `{GridF, FluenceOptions, rotated jaw outlines}` for one reconstructed beam. Immutable.
pub struct FieldFluence {
    pub grid: GridF,
    pub options: FluenceOptions,
    pub jaw_outlines: Vec<Polygon>,
}

fn jaw_rotation(options: &FluenceOptions, field: &impl IFieldData) -> f64 {
    options
        .fixed_collimator_angle
        .unwrap_or_else(|| field.collimator_deg()) as f64
}

fn rotated_jaw_outline(options: &FluenceOptions, field: &impl IFieldData) -> (Polygon, Aabb) {
    let (x1, y1, x2, y2) = field.jaws();
    let coll = jaw_rotation(options, field);
    let rot = Matrix::rotation(coll);
    let corners = [
        Point::new(x1 as f64, y1 as f64),
        Point::new(x2 as f64, y1 as f64),
        Point::new(x2 as f64, y2 as f64),
        Point::new(x1 as f64, y2 as f64),
    ]
    .map(|p| rot.apply(p));
    let aabb = Aabb::from_points(&corners).expect("4 corners");
    (Polygon::new(corners.to_vec()), aabb)
}

/// Union AABB of every snapshot's rotated jaw extent, expanded by `options.margin`; or, if
/// the caller supplied `width`/`height`, a grid centered at the origin of that fixed size.
pub fn compute_extent(options: &FluenceOptions, fields: &[impl IFieldData]) -> Aabb {
    if options.width > 0.0 && options.height > 0.0 {
        return Aabb {
            min_x: -options.width / 2.0,
            min_y: -options.height / 2.0,
            max_x: options.width / 2.0,
            max_y: options.height / 2.0,
        };
    }

    let mut union: Option<Aabb> = None;
    for field in fields {
        let (_, aabb) = rotated_jaw_outline(options, field);
        union = Some(match union {
            Some(u) => u.union(&aabb),
            None => aabb,
        });
    }

    union
        .unwrap_or(Aabb {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        })
        .expand(options.margin)
}

fn x_range_at_row(corners: &[Point], y: f64) -> Option<(f64, f64)> {
    let n = corners.len();
    let mut xs = Vec::new();
    for i in 0..n {
        let a = corners[i];
        let b = corners[(i + 1) % n];
        if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
            let t = (y - a.y) / (b.y - a.y);
            xs.push(a.x + t * (b.x - a.x));
        }
    }
    if xs.len() < 2 {
        return None;
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    Some((xs[0], *xs.last().unwrap()))
}

const FULL_COVERAGE_EPS: f64 = 1e-6;

fn rasterize_exact(grid: &mut GridF, corners_px: &[Point], value: f32) -> Result<()> {
    let aabb = match Aabb::from_points(corners_px) {
        Some(a) => a,
        None => return Ok(()),
    };
    let col_min = aabb.min_x.floor().max(0.0) as i32;
    let col_max = aabb.max_x.ceil().min(grid.cols() as f64) as i32;
    let row_min = aabb.min_y.floor().max(0.0) as i32;
    let row_max = aabb.max_y.ceil().min(grid.rows() as f64) as i32;

    for row in row_min..row_max {
        for col in col_min..col_max {
            let pixel = Aabb {
                min_x: col as f64,
                min_y: row as f64,
                max_x: (col + 1) as f64,
                max_y: (row + 1) as f64,
            };
            let area = clip_area(corners_px, &pixel)?;
            if area <= 0.0 {
                continue;
            }
            let frac = if area >= 1.0 - FULL_COVERAGE_EPS {
                1.0
            } else {
                area
            };
            grid.add_at(col, row, value * frac as f32);
        }
    }
    Ok(())
}

fn rasterize_approximate(grid: &mut GridF, corners_px: &[Point], value: f32) {
    let aabb = match Aabb::from_points(corners_px) {
        Some(a) => a,
        None => return,
    };
    let row_min = aabb.min_y.floor().max(0.0) as i32;
    let row_max = aabb.max_y.ceil().min(grid.rows() as f64) as i32;

    for row in row_min..row_max {
        let y_mid = row as f64 + 0.5;
        let Some((start_x, end_x)) = x_range_at_row(corners_px, y_mid) else {
            continue;
        };
        if end_x <= start_x {
            continue;
        }
        let col_min = start_x.floor().max(0.0) as i32;
        let col_max = end_x.ceil().min(grid.cols() as f64) as i32;
        for col in col_min..col_max {
            let covered = (((col + 1) as f64).min(end_x) - (col as f64).max(start_x)).max(0.0);
            if covered <= 0.0 {
                continue;
            }
            grid.add_at(col, row, value * covered as f32);
        }
    }
}

fn accumulate_snapshot(
    options: &FluenceOptions,
    field: &impl IFieldData,
    grid: &mut GridF,
) -> Result<()> {
    if field.delta_mu() <= options.min_delta_mu {
        return Ok(());
    }
    if options.exclude_beam_holds && field.beam_hold() {
        return Ok(());
    }

    let (x1, y1, x2, y2) = field.jaws();
    let geom = LeafGeometry::for_model(field.mlc_model());
    let coll = jaw_rotation(options, field);
    let rot = Matrix::rotation(coll);
    let value = field.delta_mu();

    for pair in 0..geom.num_leaf_pairs() {
        let a = field.leaf_mm(0, pair).clamp(x1, x2);
        let b = field.leaf_mm(1, pair).clamp(x1, x2);
        let width = (a - b) as f64;
        if width <= 0.0 {
            continue;
        }

        let leaf_thickness = geom.leaf_width(pair);
        let center_y = geom.center_y(pair);
        let y_min = (center_y - leaf_thickness / 2.0).clamp(y1 as f64, y2 as f64);
        let y_max = (center_y + leaf_thickness / 2.0).clamp(y1 as f64, y2 as f64);
        let height = y_max - y_min;
        if height < 1e-4 {
            continue;
        }

        let x_center = (a as f64 + b as f64) / 2.0;
        let y_center = (y_min + y_max) / 2.0;
        let rotated_center = rot.apply(Point::new(x_center, y_center));
        let rect = RotatedRect::new(rotated_center, width / 2.0, height / 2.0, coll);
        let (corners, _) = rect.corners_and_bounds();

        let corners_px: Vec<Point> = corners
            .iter()
            .map(|p| {
                let (c, r) = grid.world_to_grid(p.x, p.y);
                Point::new(c, r)
            })
            .collect();

        if options.use_approximate_fluence {
            rasterize_approximate(grid, &corners_px, value);
        } else {
            rasterize_exact(grid, &corners_px, value)?;
        }
    }

    Ok(())
}

fn accumulate_all(
    options: &FluenceOptions,
    fields: &[impl IFieldData + Sync],
    base: GridF,
) -> Result<GridF> {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        let workers = options.max_parallelism.max(1);
        let chunk_size = fields.len().div_ceil(workers).max(1);

        let partials: Vec<GridF> = fields
            .par_chunks(chunk_size)
            .map(|chunk| -> Result<GridF> {
                let mut local = base.clone();
                for field in chunk {
                    accumulate_snapshot(options, field, &mut local)?;
                }
                Ok(local)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut total = base;
        for partial in partials {
            total.add_assign(&partial)?;
        }
        Ok(total)
    }

    #[cfg(not(feature = "rayon"))]
    {
        let mut total = base;
        for field in fields {
            accumulate_snapshot(options, field, &mut total)?;
        }
        Ok(total)
    }
}

/// Reconstructs delivered fluence from a sequence of field states (§4.4). Never fails on an
/// individual snapshot: out-of-precondition apertures (non-positive width, sub-threshold
/// height, below-threshold dose, excluded beam holds) are silently skipped (§7 policy).
pub fn reconstruct(options: &FluenceOptions, fields: &[impl IFieldData + Sync]) -> Result<FieldFluence> {
    let aabb = compute_extent(options, fields);
    let grid = GridF::new(
        aabb.min_x,
        aabb.min_y,
        aabb.width(),
        aabb.height(),
        options.cols,
        options.rows,
    );

    let jaw_outlines = fields
        .iter()
        .map(|f| rotated_jaw_outline(options, f).0)
        .collect();

    let grid = accumulate_all(options, fields, grid)?;

    Ok(FieldFluence {
        grid,
        options: *options,
        jaw_outlines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MlcModel;

    struct FakeField {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        gantry: f32,
        coll: f32,
        leaves: Vec<(f32, f32)>,
        mu: f32,
        hold: bool,
    }

    impl IFieldData for FakeField {
        fn jaws(&self) -> (f32, f32, f32, f32) {
            (self.x1, self.y1, self.x2, self.y2)
        }
        fn gantry_deg(&self) -> f32 {
            self.gantry
        }
        fn collimator_deg(&self) -> f32 {
            self.coll
        }
        fn leaf_mm(&self, bank: usize, index: usize) -> f32 {
            if bank == 0 {
                self.leaves[index].0
            } else {
                self.leaves[index].1
            }
        }
        fn delta_mu(&self) -> f32 {
            self.mu
        }
        fn beam_hold(&self) -> bool {
            self.hold
        }
        fn mlc_model(&self) -> MlcModel {
            MlcModel::Nds80
        }
    }

    fn wide_open_field(mu: f32) -> FakeField {
        FakeField {
            x1: -100.0,
            y1: -100.0,
            x2: 100.0,
            y2: 100.0,
            gantry: 0.0,
            coll: 0.0,
            leaves: vec![(100.0, -100.0); 40],
            mu,
            hold: false,
        }
    }

    #[test]
    fn wide_open_field_deposits_total_mu_times_area() {
        let options = FluenceOptions {
            cols: 40,
            rows: 40,
            width: 200.0,
            height: 200.0,
            max_parallelism: 1,
            ..FluenceOptions::default()
        };
        let fields = vec![wide_open_field(1.0)];
        let result = reconstruct(&options, &fields).unwrap();

        let total: f64 = result.grid.data().iter().map(|&v| v as f64).sum();
        let pixel_area = (options.width / options.cols as f64) * (options.height / options.rows as f64);
        let expected = 1.0 * options.cols as f64 * options.rows as f64 * pixel_area;
        // each leaf pair contributes MU over its own footprint, covering the full grid area
        assert!((total - expected).abs() / expected < 0.02);
    }

    #[test]
    fn below_threshold_mu_is_skipped() {
        let options = FluenceOptions {
            cols: 10,
            rows: 10,
            width: 200.0,
            height: 200.0,
            min_delta_mu: 0.5,
            max_parallelism: 1,
            ..FluenceOptions::default()
        };
        let fields = vec![wide_open_field(0.1)];
        let result = reconstruct(&options, &fields).unwrap();
        assert!(result.grid.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn exact_and_approximate_agree_within_tolerance() {
        let fields = vec![wide_open_field(2.0)];
        let mut exact_opts = FluenceOptions {
            cols: 50,
            rows: 50,
            width: 200.0,
            height: 200.0,
            max_parallelism: 1,
            ..FluenceOptions::default()
        };
        let approx_opts = FluenceOptions {
            use_approximate_fluence: true,
            ..exact_opts
        };
        exact_opts.use_approximate_fluence = false;

        let exact = reconstruct(&exact_opts, &fields).unwrap();
        let approx = reconstruct(&approx_opts, &fields).unwrap();

        let exact_total: f64 = exact.grid.data().iter().map(|&v| v as f64).sum();
        let approx_total: f64 = approx.grid.data().iter().map(|&v| v as f64).sum();
        assert!((exact_total - approx_total).abs() / exact_total < 0.02);
    }
}
