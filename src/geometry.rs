/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Geometry primitives: axis-aligned rects/boxes, a 2x2 rotation/scale matrix, polygons and
//! rotated rectangles with their tight bounding box.

use crate::error::{Result, TrajLogError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> f64 {
        self.x
    }
    pub fn right(&self) -> f64 {
        self.x + self.w
    }
    pub fn bottom(&self) -> f64 {
        self.y
    }
    pub fn top(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.bottom() && p.y <= self.top()
    }

    pub fn to_aabb(self) -> Aabb {
        Aabb {
            min_x: self.x,
            min_y: self.y,
            max_x: self.x + self.w,
            max_y: self.y + self.h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    pub fn from_points(points: &[Point]) -> Option<Aabb> {
        let mut iter = points.iter();
        let first = iter.next()?;
        let mut aabb = Aabb {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            aabb.min_x = aabb.min_x.min(p.x);
            aabb.min_y = aabb.min_y.min(p.y);
            aabb.max_x = aabb.max_x.max(p.x);
            aabb.max_y = aabb.max_y.max(p.y);
        }
        Some(aabb)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Union bounding box of `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn expand(&self, margin: f64) -> Aabb {
        Aabb {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// 2x2 matrix for rotation/scaling of 2-D points, laid out row-major `[[m00, m01], [m10, m11]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub m: [[f64; 2]; 2],
}

impl Matrix {
    pub fn identity() -> Self {
        Matrix {
            m: [[1.0, 0.0], [0.0, 1.0]],
        }
    }

    /// Counter-clockwise rotation by `degrees`.
    pub fn rotation(degrees: f64) -> Self {
        let rad = degrees.to_radians();
        let (s, c) = rad.sin_cos();
        Matrix {
            m: [[c, -s], [s, c]],
        }
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Matrix {
            m: [[sx, 0.0], [0.0, sy]],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        if row > 1 || col > 1 {
            return Err(TrajLogError::OutOfRange(format!(
                "matrix index [{row},{col}] out of range"
            )));
        }
        Ok(self.m[row][col])
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.m[0][0] * p.x + self.m[0][1] * p.y,
            y: self.m[1][0] * p.x + self.m[1][1] * p.y,
        }
    }

    pub fn mul(&self, other: &Matrix) -> Matrix {
        let mut out = [[0.0; 2]; 2];
        for r in 0..2 {
            for c in 0..2 {
                out[r][c] = self.m[r][0] * other.m[0][c] + self.m[r][1] * other.m[1][c];
            }
        }
        Matrix { m: out }
    }
}

/// An ordered vertex sequence. Area is computed via the shoelace formula and is invariant
/// to winding order (the absolute value is taken).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Polygon { vertices }
    }

    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        (sum * 0.5).abs()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }
}

/// A rectangle of half-width `hw`/half-height `hh` centered at `center`, rotated by `angle_deg`
/// (counter-clockwise). Corners are materialized in CCW order `{TR, BR, BL, TL}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub center: Point,
    pub half_width: f64,
    pub half_height: f64,
    pub angle_deg: f64,
}

impl RotatedRect {
    pub fn new(center: Point, half_width: f64, half_height: f64, angle_deg: f64) -> Self {
        RotatedRect {
            center,
            half_width,
            half_height,
            angle_deg,
        }
    }

    /// Returns the 4 rotated corners (CCW: TR, BR, BL, TL) and their tight AABB, per the
    /// decomposition in spec §4.4: `hwX/hwY` is the half-width vector, `hhX/hhY` the
    /// half-height vector, both pre-rotated by `angle_deg`.
    pub fn corners_and_bounds(&self) -> ([Point; 4], Aabb) {
        let rad = self.angle_deg.to_radians();
        let (s, c) = rad.sin_cos();

        let hw_x = self.half_width * c;
        let hw_y = self.half_width * s;
        let hh_x = -self.half_height * s;
        let hh_y = self.half_height * c;

        let cx = self.center.x;
        let cy = self.center.y;

        let tr = Point::new(cx + hw_x + hh_x, cy + hw_y + hh_y);
        let br = Point::new(cx + hw_x - hh_x, cy + hw_y - hh_y);
        let bl = Point::new(cx - hw_x - hh_x, cy - hw_y - hh_y);
        let tl = Point::new(cx - hw_x + hh_x, cy - hw_y + hh_y);

        let corners = [tr, br, bl, tl];

        let extent_x = hw_x.abs() + hh_x.abs();
        let extent_y = hw_y.abs() + hh_y.abs();
        let aabb = Aabb {
            min_x: cx - extent_x,
            min_y: cy - extent_y,
            max_x: cx + extent_x,
            max_y: cy + extent_y,
        };

        (corners, aabb)
    }

    pub fn to_polygon(&self) -> Polygon {
        let (corners, _) = self.corners_and_bounds();
        Polygon::new(corners.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn shoelace_invariant_to_winding() {
        let ccw = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        let cw = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        ]);
        assert!((ccw.area() - 100.0).abs() < 1e-9);
        assert!((cw.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rotated_rect_bounds_are_tight() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10_000 {
            let angle: f64 = rng.gen_range(-720.0..720.0);
            let hw: f64 = rng.gen_range(0.1..500.0);
            let hh: f64 = rng.gen_range(0.1..500.0);
            let rect = RotatedRect::new(Point::new(0.0, 0.0), hw, hh, angle);
            let (corners, aabb) = rect.corners_and_bounds();

            let tight = Aabb::from_points(&corners).unwrap();
            assert!((aabb.min_x - tight.min_x).abs() < 1e-6);
            assert!((aabb.min_y - tight.min_y).abs() < 1e-6);
            assert!((aabb.max_x - tight.max_x).abs() < 1e-6);
            assert!((aabb.max_y - tight.max_y).abs() < 1e-6);
        }
    }
}
