//! Straight projection paths through the grid.

use std::f32::consts::{FRAC_PI_2, TAU};

use geometry::{Point, Vector};
use crate::grid::Grid;

/// Relative size below which a direction component counts as zero
const PARALLEL: f32 = 4.0 * f32::EPSILON;

/// The line through `R(θ)(xi, yi)` (the source) and `R(θ)(-xi, yi)` (the
/// detector), where `R(θ)` is the rotation by the angle whose sine and cosine
/// are `sin_p` and `cos_p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub xi: f32,
    pub yi: f32,
    pub sin_p: f32,
    pub cos_p: f32,
}

impl Ray {

    pub fn new(theta_p: f32, xi: f32, yi: f32) -> Self {
        let (sin_p, cos_p) = theta_p.sin_cos();
        Self { xi, yi, sin_p, cos_p }
    }

    /// The ray hitting detector pixel `d` (of `dx`) at projection angle `theta`.
    ///
    /// The source sits far enough away to be outside the grid for any angle.
    pub fn for_detector(grid: &Grid, theta: f32, d: usize, dx: usize) -> Self {
        let theta_p = (theta + FRAC_PI_2).rem_euclid(TAU);
        let xi = -((grid.ry + grid.rz) as f32);
        let yi = 0.5 * (1.0 - dx as f32) + d as f32 + grid.mov;
        Self::new(theta_p, xi, yi)
    }

    pub fn source(&self) -> Point {
        Point::new(self.xi, self.yi).rotated(self.sin_p, self.cos_p)
    }

    pub fn detector(&self) -> Point {
        Point::new(-self.xi, self.yi).rotated(self.sin_p, self.cos_p)
    }

    /// Direction of travel from source to detector (not normalized)
    pub fn direction(&self) -> Vector { self.detector() - self.source() }

    /// `direction` with components negligible relative to its length flushed
    /// to zero, so that rays at multiples of 90° are exactly axis-aligned.
    pub fn flushed_direction(&self) -> Vector {
        let d = self.direction();
        let threshold = PARALLEL * d.magnitude();
        let flush = |c: f32| if c.abs() <= threshold { 0.0 } else { c };
        Vector::new(flush(d.x), flush(d.y))
    }

    /// Which way this ray's intersections must be ordered
    pub fn traversal(&self) -> Traversal {
        let Vector { x, y } = self.flushed_direction();
        Traversal {
            major: if x.abs() >= y.abs() { Axis::X } else { Axis::Y },
            rising: x * y >= 0.0,
        }
    }

    /// Length of the ray inside the grid
    pub fn chord_length(&self, grid: &Grid) -> f32 {
        geometry::box_chord_length(grid.half_width(), self.source(), self.direction())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis { X, Y }

/// Classification of a ray's direction, used to merge its intersections in
/// order: `major` is the axis along which the ray advances faster (X for rays
/// at or shallower than 45°), `rising` is true when both coordinates increase
/// together (non-negative slope).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Traversal {
    pub major: Axis,
    pub rising: bool,
}

impl Traversal {
    /// The coordinate along which intersections are ordered
    #[inline]
    pub fn key(&self, (x, y): (f32, f32)) -> f32 {
        match self.major {
            Axis::X => x,
            Axis::Y => y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/ degrees, major  , rising,
             case(    0.0, Axis::X, true ),
             case(   30.0, Axis::X, true ),
             case(   60.0, Axis::Y, true ),
             case(   90.0, Axis::Y, true ),
             case(  120.0, Axis::Y, false),
             case(  150.0, Axis::X, false),
             case(  210.0, Axis::X, true ),
             case(  300.0, Axis::Y, false),
    )]
    fn traversal_classes(degrees: f32, major: Axis, rising: bool) {
        let ray = Ray::new(degrees.to_radians(), -10.0, 0.3);
        assert_eq!(ray.traversal(), Traversal { major, rising });
    }

    #[test]
    fn axis_aligned_directions_are_exact() {
        for quarter in 0..4 {
            let ray = Ray::new(quarter as f32 * FRAC_PI_2, -10.0, 0.7);
            let d = ray.flushed_direction();
            assert!(d.x == 0.0 || d.y == 0.0, "{quarter}: {d:?}");
        }
    }

    #[test]
    fn source_and_detector_are_symmetric_about_the_offset() {
        let ray = Ray::new(0.0, -8.0, 1.5);
        assert_eq!(ray.source(),   Point::new(-8.0, 1.5));
        assert_eq!(ray.detector(), Point::new( 8.0, 1.5));
        assert_eq!(ray.direction(), Vector::new(16.0, 0.0));
    }

    #[test]
    fn detector_rays_are_spaced_by_one_pixel() {
        let grid = Grid::new(6, 6, 6, 2.5).unwrap();
        let dx = 6;
        let offsets: Vec<f32> = (0..dx)
            .map(|d| Ray::for_detector(&grid, 0.3, d, dx).yi)
            .collect();
        for w in offsets.windows(2) {
            assert_float_eq!(w[1] - w[0], 1.0, abs <= 1e-6);
        }
        assert_float_eq!(offsets[0], -2.5 + grid.mov, abs <= 1e-6);
    }

    #[test]
    fn detector_rays_start_outside_the_grid() {
        let grid = Grid::new(10, 7, 10, 4.5).unwrap();
        let hw = grid.half_width();
        for p in 0..16 {
            let theta = p as f32 * 0.4;
            for d in [0, 5, 9] {
                let s = Ray::for_detector(&grid, theta, d, 10).source();
                assert!(s.x.abs() > hw.x || s.y.abs() > hw.y);
            }
        }
    }

    #[test]
    fn chord_through_centre_of_square() {
        let grid = Grid::new(4, 4, 4, 1.5).unwrap();
        let ray = Ray::new(0.0, -8.0, 0.0);
        assert_float_eq!(ray.chord_length(&grid), 4.0, abs <= 1e-5);
        let ray = Ray::new(std::f32::consts::FRAC_PI_4, -8.0, 0.0);
        assert_float_eq!(ray.chord_length(&grid), 4.0 * std::f32::consts::SQRT_2, abs <= 1e-4);
    }
}
