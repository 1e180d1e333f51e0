//! Per-ray storage of the pixels traversed and their path-length weights.

use crate::grid::Grid;
use crate::ray::Ray;
use crate::siddon::{calc_dist, calc_sum_sqr, Siddon};

/// Identifies one ray: slice `s`, projection angle index `p`, detector pixel `d`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RayKey {
    pub s: usize,
    pub p: usize,
    pub d: usize,
}

impl RayKey {
    pub fn new(s: usize, p: usize, d: usize) -> Self { Self { s, p, d } }

    /// Every ray of a sweep over `slices` x `angles` x `pixels`, slice-major
    pub fn sweep(slices: usize, angles: usize, pixels: usize) -> impl Iterator<Item = Self> {
        itertools::iproduct!(0..slices, 0..angles, 0..pixels)
            .map(|(s, p, d)| Self { s, p, d })
    }
}

/// Acquisition geometry shared by all rays of a pass: the grid, the projection
/// angles and the number of detector pixels per angle.
#[derive(Clone, Copy, Debug)]
pub struct Scan<'a> {
    pub grid: &'a Grid,
    pub theta: &'a [f32],
    pub pixels: usize,
}

impl<'a> Scan<'a> {
    pub fn new(grid: &'a Grid, theta: &'a [f32], pixels: usize) -> Self { Self { grid, theta, pixels } }

    pub fn angles(&self) -> usize { self.theta.len() }

    /// Is `key` one of the rays of this scan, restricted to `slices` slices?
    pub fn contains(&self, key: RayKey, slices: usize) -> bool {
        key.s < slices && key.p < self.angles() && key.d < self.pixels
    }

    /// Weights of the ray `key`, which must satisfy `contains`
    pub(crate) fn trace(&self, key: RayKey, siddon: &mut Siddon) -> AngleData {
        AngleData::traced(key, self.grid, self.theta[key.p], self.pixels, siddon)
    }
}

/// The weights and indices of the pixels coupled to a single ray.
///
/// The buffers are allocated once, with room for the longest possible ray
/// through the grid, and are refilled by `trace` for each new ray.
#[derive(Clone, Debug, PartialEq)]
pub struct AngleData {
    pub s: usize,
    pub p: usize,
    pub d: usize,
    /// Number of intersection points (one more than the number of segments)
    pub csize: usize,
    pub sum_dist_sqr: f32,
    pub indi: Vec<usize>,
    pub dist: Vec<f32>,
}

impl AngleData {

    pub fn new(key: RayKey, grid: &Grid) -> Self {
        let RayKey { s, p, d } = key;
        let capacity = grid.max_crossings();
        Self {
            s, p, d,
            csize: 0,
            sum_dist_sqr: 0.0,
            indi: Vec::with_capacity(capacity),
            dist: Vec::with_capacity(capacity),
        }
    }

    /// Compute the weights of the ray `key` at angle `theta`, with detector
    /// width `dx`
    pub fn traced(key: RayKey, grid: &Grid, theta: f32, dx: usize, siddon: &mut Siddon) -> Self {
        let mut data = Self::new(key, grid);
        data.trace(grid, &Ray::for_detector(grid, theta, key.d, dx), siddon);
        data
    }

    /// Replace the contents with the weights of `ray`
    pub fn trace(&mut self, grid: &Grid, ray: &Ray, siddon: &mut Siddon) {
        let merged = siddon.intersections(grid, ray);
        self.csize = merged.csize();
        calc_dist(grid, merged, &mut self.indi, &mut self.dist);
        self.sum_dist_sqr = calc_sum_sqr(&self.dist);
    }

    /// Reuse the buffers for another ray
    pub fn rekey(&mut self, RayKey { s, p, d }: RayKey) {
        self.s = s;
        self.p = p;
        self.d = d;
    }

    pub fn key(&self) -> RayKey { RayKey { s: self.s, p: self.p, d: self.d } }

    /// Does the ray pass through any pixel?
    pub fn is_empty(&self) -> bool { self.dist.is_empty() }

    /// Total length of the ray inside the grid
    pub fn length(&self) -> f32 { self.dist.iter().sum() }

    /// Flattened pixel indices paired with their weights
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indi.iter().copied().zip(self.dist.iter().copied())
    }
}
