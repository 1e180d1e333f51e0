//! Find the pixels traversed by a single ray, and the length of the ray inside
//! each of them.
//!
//! The calculation proceeds in four stages:
//!
//! 1. For every grid line, find where the (infinite) ray crosses it
//!    (`calc_coords`).
//!
//! 2. Discard crossings which lie outside the grid (`trim_coords`). This leaves
//!    two families of points: crossings of horizontal lines (A) and of vertical
//!    lines (B), each of which is already ordered along the ray.
//!
//! 3. Merge the two families into a single sequence ordered along the ray's
//!    major axis (`sort_intersections`). Where the ray passes through a grid
//!    vertex, both families contain (almost) the same point: only one is kept.
//!
//! 4. Each pair of consecutive points bounds a segment lying within one pixel:
//!    its length is the weight of that pixel, and its midpoint identifies the
//!    pixel (`calc_dist`, `calc_dist2`).
//!
//! The stages write into caller-provided buffers, because they are called once
//! per ray in the inner loop of every projection, and reallocating the buffers
//! for each ray had a noticeable cost. `Siddon` bundles the buffers needed by
//! stages 1-3.

use itertools::{Either, Itertools};

use crate::grid::Grid;
use crate::ray::{Axis, Ray, Traversal};

/// Tolerance used when deciding whether a crossing lies on the grid boundary,
/// and whether two crossings are the same grid vertex.
pub const TOLERANCE: f32 = 1e-4;

// ----- Stage 1 ---------------------------------------------------------------------------------

/// Positions at which a ray crosses every grid line.
///
/// `coordx[n]` is the x-coordinate at which the ray crosses `y = gridy[n]`;
/// `coordy[n]` is the y-coordinate at which it crosses `x = gridx[n]`. A ray
/// parallel to a family of lines never crosses them: the corresponding entries
/// are infinite.
#[derive(Clone, Debug, Default)]
pub struct Crossings {
    pub coordx: Vec<f32>,
    pub coordy: Vec<f32>,
}

impl Crossings {
    pub fn new(grid: &Grid, ray: &Ray) -> Self {
        let mut crossings = Self::default();
        calc_coords(grid, ray, &mut crossings);
        crossings
    }
}

pub fn calc_coords(grid: &Grid, ray: &Ray, crossings: &mut Crossings) {
    let Crossings { coordx, coordy } = crossings;
    coordx.clear();
    coordy.clear();

    let centre = ray.source().midpoint(ray.detector());
    let direction = ray.flushed_direction();

    if direction.x == 0.0 {
        // Vertical ray: never meets x = const, meets every y = const at the same x
        coordy.extend(grid.gridx.iter().map(|_| f32::INFINITY));
        coordx.extend(grid.gridy.iter().map(|_| centre.x));
    } else if direction.y == 0.0 {
        // Horizontal ray
        coordy.extend(grid.gridx.iter().map(|_| centre.y));
        coordx.extend(grid.gridy.iter().map(|_| f32::INFINITY));
    } else {
        let slope  = direction.y / direction.x;
        let islope = direction.x / direction.y;
        coordy.extend(grid.gridx.iter().map(|&gx|  slope * (gx - centre.x) + centre.y));
        coordx.extend(grid.gridy.iter().map(|&gy| islope * (gy - centre.y) + centre.x));
    }
}

// ----- Stage 2 ---------------------------------------------------------------------------------

/// Crossings lying within the grid: `(ax, ay)` on horizontal lines, `(bx, by)`
/// on vertical lines.
#[derive(Clone, Debug, Default)]
pub struct Trimmed {
    pub ax: Vec<f32>,
    pub ay: Vec<f32>,
    pub bx: Vec<f32>,
    pub by: Vec<f32>,
}

impl Trimmed {
    pub fn clear(&mut self) {
        self.ax.clear();
        self.ay.clear();
        self.bx.clear();
        self.by.clear();
    }

    pub fn len_a(&self) -> usize { self.ax.len() }
    pub fn len_b(&self) -> usize { self.bx.len() }
}

/// Keep only those crossings whose free coordinate lies within the grid
/// (boundaries included). Kept coordinates are clamped onto the grid, so that
/// crossings lying just outside by rounding error land exactly on its edge.
///
/// A crossing just outside the grid is only kept where the ray passes through
/// the grid vertex at the end of its line: rays running along the outside of
/// an edge must not pick up weight in the pixels next to it.
pub fn trim_coords(grid: &Grid, crossings: &Crossings, trimmed: &mut Trimmed) {
    trimmed.clear();
    let Crossings { coordx, coordy } = crossings;
    let (x_lo, x_hi) = (grid.gridx[0], grid.gridx[grid.ry]);
    let (y_lo, y_hi) = (grid.gridy[0], grid.gridy[grid.rz]);
    // Where the ray crosses the left, right, bottom and top edges
    let (left, right) = (coordy[0], coordy[grid.ry]);
    let (bottom, top) = (coordx[0], coordx[grid.rz]);

    for (&x, &gy) in coordx.iter().zip(&grid.gridy) {
        let keep = if x < x_lo { through_vertex(x, x_lo, left, gy) }
              else if x > x_hi { through_vertex(x, x_hi, right, gy) }
              else             { true };
        if keep {
            trimmed.ax.push(x.clamp(x_lo, x_hi));
            trimmed.ay.push(gy);
        }
    }
    for (&y, &gx) in coordy.iter().zip(&grid.gridx) {
        let keep = if y < y_lo { through_vertex(y, y_lo, bottom, gx) }
              else if y > y_hi { through_vertex(y, y_hi, top, gx) }
              else             { true };
        if keep {
            trimmed.bx.push(gx);
            trimmed.by.push(y.clamp(y_lo, y_hi));
        }
    }
}

/// Is a crossing at `free`, beyond the grid `edge`, really the vertex where
/// the ray meets that edge? `companion` is where the ray crosses the edge,
/// `line` is the grid line on which the crossing was found.
#[inline]
fn through_vertex(free: f32, edge: f32, companion: f32, line: f32) -> bool {
    (free - edge).abs() <= TOLERANCE && (companion - line).abs() <= TOLERANCE
}

// ----- Stage 3 ---------------------------------------------------------------------------------

/// Intersections of the ray with the grid lines, ordered along the ray's major
/// axis.
#[derive(Clone, Debug, Default)]
pub struct Intersections {
    pub coorx: Vec<f32>,
    pub coory: Vec<f32>,
    /// Number of points dropped because they duplicated their predecessor (the
    /// ray passing through a grid vertex).
    pub coincident: usize,
}

impl Intersections {
    pub fn csize(&self) -> usize { self.coorx.len() }

    pub fn clear(&mut self) {
        self.coorx.clear();
        self.coory.clear();
        self.coincident = 0;
    }

    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.coorx.iter().copied().zip(self.coory.iter().copied())
    }
}

/// Merge the two families of trimmed crossings into one sequence, ascending
/// along `traversal.major`.
///
/// Family A is generated in order of increasing y, family B in order of
/// increasing x. When the major axis is the other one, the family's order
/// along it depends on the sign of the slope: falling rays walk that family in
/// reverse.
pub fn sort_intersections(traversal: Traversal, trimmed: &Trimmed, merged: &mut Intersections) {
    merged.clear();

    let a_ascending = traversal.major == Axis::Y || traversal.rising;
    let b_ascending = traversal.major == Axis::X || traversal.rising;

    let a = family(&trimmed.ax, &trimmed.ay, a_ascending);
    let b = family(&trimmed.bx, &trimmed.by, b_ascending);

    let mut coincident = 0;
    for (count, (x, y)) in a
        .merge_by(b, |&p, &q| traversal.key(p) <= traversal.key(q))
        .dedup_by_with_count(|&p, &q| coincide(p, q))
    {
        coincident += count - 1;
        merged.coorx.push(x);
        merged.coory.push(y);
    }
    merged.coincident = coincident;
}

fn family<'a>(xs: &'a [f32], ys: &'a [f32], ascending: bool) -> impl Iterator<Item = (f32, f32)> + 'a {
    let points = xs.iter().copied().zip(ys.iter().copied());
    if ascending { Either::Left(points) } else { Either::Right(points.rev()) }
}

#[inline]
fn coincide((x0, y0): (f32, f32), (x1, y1): (f32, f32)) -> bool {
    (x1 - x0).abs() <= TOLERANCE && (y1 - y0).abs() <= TOLERANCE
}

// ----- Stage 4 ---------------------------------------------------------------------------------

/// Lengths of the segments between consecutive intersections, and the
/// flattened indices (`indx * rz + indy`) of the pixels containing them.
pub fn calc_dist(grid: &Grid, merged: &Intersections, indi: &mut Vec<usize>, dist: &mut Vec<f32>) {
    indi.clear();
    dist.clear();
    for (length, ix, iy) in segments(grid, merged) {
        indi.push(grid.index1(ix, iy));
        dist.push(length);
    }
}

/// Like `calc_dist`, but with the pixel row and column kept separate.
pub fn calc_dist2(
    grid: &Grid,
    merged: &Intersections,
    indx: &mut Vec<usize>,
    indy: &mut Vec<usize>,
    dist: &mut Vec<f32>,
) {
    indx.clear();
    indy.clear();
    dist.clear();
    for (length, ix, iy) in segments(grid, merged) {
        indx.push(ix);
        indy.push(iy);
        dist.push(length);
    }
}

fn segments<'a>(grid: &'a Grid, merged: &'a Intersections) -> impl Iterator<Item = (f32, usize, usize)> + 'a {
    merged.points()
        .tuple_windows()
        .map(move |((x0, y0), (x1, y1))| {
            let length = (x1 - x0).hypot(y1 - y0);
            let ix = pixel(0.5 * (x0 + x1), grid.ry);
            let iy = pixel(0.5 * (y0 + y1), grid.rz);
            (length, ix, iy)
        })
}

/// Index of the pixel containing `mid`, along an axis with `n` pixels centred
/// on the origin. Midpoints which rounding has pushed onto (or past) the edge
/// of the grid are clamped into the nearest pixel.
#[inline]
fn pixel(mid: f32, n: usize) -> usize {
    let i = (mid + 0.5 * n as f32).floor();
    if i <= 0.0 { 0 } else { (i as usize).min(n - 1) }
}

// ----- Reduction -------------------------------------------------------------------------------

/// Sum of squared path lengths: normalization denominator for updates.
pub fn calc_sum_sqr(dist: &[f32]) -> f32 {
    dist.iter().map(|d| d * d).sum()
}

// ----- Scratch space ---------------------------------------------------------------------------

/// Buffers for stages 1-3, sized for one grid and reused for every ray.
#[derive(Clone, Debug, Default)]
pub struct Siddon {
    crossings: Crossings,
    trimmed: Trimmed,
    intersections: Intersections,
}

impl Siddon {

    pub fn new(grid: &Grid) -> Self {
        let (nx, ny) = (grid.ry + 1, grid.rz + 1);
        Self {
            crossings: Crossings { coordx: Vec::with_capacity(ny), coordy: Vec::with_capacity(nx) },
            trimmed: Trimmed {
                ax: Vec::with_capacity(ny), ay: Vec::with_capacity(ny),
                bx: Vec::with_capacity(nx), by: Vec::with_capacity(nx),
            },
            intersections: Intersections {
                coorx: Vec::with_capacity(nx + ny),
                coory: Vec::with_capacity(nx + ny),
                coincident: 0,
            },
        }
    }

    /// Run stages 1-3 for `ray`, overwriting the results of the previous ray
    pub fn intersections(&mut self, grid: &Grid, ray: &Ray) -> &Intersections {
        calc_coords(grid, ray, &mut self.crossings);
        trim_coords(grid, &self.crossings, &mut self.trimmed);
        sort_intersections(ray.traversal(), &self.trimmed, &mut self.intersections);
        &self.intersections
    }

    /// The trimmed crossings of the most recent ray
    pub fn trimmed(&self) -> &Trimmed { &self.trimmed }

    pub fn crossings(&self) -> &Crossings { &self.crossings }
}

#[cfg(test)]
mod test {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use float_eq::assert_float_eq;
    use rstest::rstest;

    fn trace(grid: &Grid, ray: &Ray) -> (Intersections, Vec<(usize, usize)>, Vec<f32>) {
        let mut siddon = Siddon::new(grid);
        let merged = siddon.intersections(grid, ray).clone();
        let (mut indx, mut indy, mut dist) = (vec![], vec![], vec![]);
        calc_dist2(grid, &merged, &mut indx, &mut indy, &mut dist);
        let pixels = indx.into_iter().zip(indy).collect();
        (merged, pixels, dist)
    }

    // --------------------------------------------------------------------------------
    // Hand-picked rays whose traversal is easy to verify by drawing it. Checks
    // the total length inside the grid and the set of pixels crossed.
    #[rstest(/**/ degrees,   yi     ,  n   ,  length  , expected_pixels,
             // horizontal and vertical through the middle of a 3x3 grid
             case(    0.0, 0.0      , (3,3), 3.0      , vec![(0,1), (1,1), (2,1)]),
             case(   90.0, 0.2      , (3,3), 3.0      , vec![(1,0), (1,1), (1,2)]),
             // both diagonals, through every vertex on the way
             case(   45.0, 0.0      , (3,3), 4.2426405, vec![(0,0), (1,1), (2,2)]),
             case(  135.0, 0.0      , (3,3), 4.2426405, vec![(0,2), (1,1), (2,0)]),
             // slope 1/2 through a 4x2 grid, offset so that it exits via the top
             case( 26.565051, 0.2236068, (4,2), 3.9131189, vec![(0,0), (1,0), (1,1), (2,1), (3,1)]),
             // reversed direction of travel covers the same pixels
             case(206.565051, -0.2236068, (4,2), 3.9131189, vec![(0,0), (1,0), (1,1), (2,1), (3,1)]),
             // misses the grid
             case(    0.0, 5.0      , (3,3), 0.0      , vec![]),
             // runs just outside an edge, or just inside it
             case(    0.0,  2.00005 , (4,4), 0.0      , vec![]),
             case(    0.0, -2.00005 , (4,4), 0.0      , vec![]),
             case(   90.0, -2.00005 , (4,4), 0.0      , vec![]),
             case(    0.0,  1.99995 , (4,4), 4.0      , vec![(0,3), (1,3), (2,3), (3,3)]),
    )]
    fn hand_picked(degrees: f32, yi: f32, n: (usize, usize), length: f32, expected_pixels: Vec<(usize, usize)>) {
        let grid = Grid::new(n.0, n.1, n.0, 0.5 * (n.0 as f32 - 1.0)).unwrap();
        let ray = Ray::new(degrees.to_radians(), -10.0, yi);
        let (_, mut pixels, dist) = trace(&grid, &ray);

        for (p, l) in pixels.iter().zip(&dist) { println!("  {p:?}  {l}") }

        let total: f32 = dist.iter().sum();
        assert_float_eq!(total, length, abs <= 1e-5);

        let mut expected_pixels = expected_pixels;
        pixels.sort();
        expected_pixels.sort();
        assert_eq!(pixels, expected_pixels);
    }

    #[test]
    fn vertex_crossings_are_counted_once() {
        let grid = Grid::new(3, 3, 3, 1.0).unwrap();
        let ray = Ray::new(45_f32.to_radians(), -10.0, 0.0);
        let mut siddon = Siddon::new(&grid);
        let merged = siddon.intersections(&grid, &ray).clone();
        let trimmed = siddon.trimmed();
        assert_eq!((trimmed.len_a(), trimmed.len_b()), (4, 4));
        assert_eq!(merged.csize(), 4);
        assert_eq!(merged.coincident, 4);
    }

    #[test]
    fn crossings_just_outside_are_kept_only_at_vertices() {
        let grid = Grid::new(4, 4, 4, 1.5).unwrap();
        let mut trimmed = Trimmed::default();

        // Almost horizontal, just above the top edge all the way across
        let graze = |x: f32| 2.00005 + 1e-5 * x;
        let crossings = Crossings {
            coordx: grid.gridy.iter().map(|&y| (y - 2.00005) * 1e5).collect(),
            coordy: grid.gridx.iter().map(|&x| graze(x)).collect(),
        };
        trim_coords(&grid, &crossings, &mut trimmed);
        assert_eq!((trimmed.len_a(), trimmed.len_b()), (0, 0));

        // Through the bottom-left corner, which rounding places just outside
        let crossings = Crossings {
            coordx: grid.gridy.iter().map(|&y| y - 0.00002).collect(),
            coordy: grid.gridx.iter().map(|&x| x + 0.00002).collect(),
        };
        trim_coords(&grid, &crossings, &mut trimmed);
        assert_eq!((trimmed.ax[0], trimmed.ay[0]), (-2.0, -2.0));
        assert_eq!((trimmed.bx[4], trimmed.by[4]), ( 2.0,  2.0));
        assert_eq!((trimmed.len_a(), trimmed.len_b()), (5, 5));
    }

    #[test]
    fn parallel_rays_do_not_divide_by_zero() {
        let grid = Grid::new(4, 4, 4, 1.5).unwrap();
        for quarter in 0..4 {
            let ray = Ray::new(quarter as f32 * std::f32::consts::FRAC_PI_2, -10.0, 0.5);
            let crossings = Crossings::new(&grid, &ray);
            let all = crossings.coordx.iter().chain(&crossings.coordy);
            assert!(all.clone().all(|c| !c.is_nan()));
            // One family is never crossed, the other is crossed at a constant
            let infinite = all.filter(|c| c.is_infinite()).count();
            assert_eq!(infinite, 5);
        }
    }

    #[test]
    fn axis_aligned_intersection_count() {
        // Ray at 0° through the middle of a pixel row crosses each vertical line once
        let grid = Grid::new(6, 4, 6, 2.5).unwrap();
        let ray = Ray::new(0.0, -10.0, 0.5);
        let (merged, pixels, dist) = trace(&grid, &ray);
        assert_eq!(merged.csize(), grid.ry + 1);
        assert_eq!(pixels.len(), grid.ry);
        assert!(dist.iter().all(|&d| d == 1.0));
        assert!(pixels.iter().all(|&(_, iy)| iy == 2));
    }

    #[test]
    fn boundary_midpoints_are_clamped() {
        assert_eq!(pixel(-2.0     , 4), 0);
        assert_eq!(pixel(-2.0001  , 4), 0);
        assert_eq!(pixel( 2.0     , 4), 3);
        assert_eq!(pixel( 1.999999, 4), 3);
        assert_eq!(pixel( 0.0     , 4), 2);
        assert_eq!(pixel(-0.5     , 3), 1);
    }

    #[test]
    fn flattened_and_dual_indices_agree() {
        let grid = Grid::new(5, 7, 5, 2.0).unwrap();
        let ray = Ray::new(0.4, -12.0, 0.3);
        let mut siddon = Siddon::new(&grid);
        let merged = siddon.intersections(&grid, &ray).clone();
        let (mut indi, mut dist1) = (vec![], vec![]);
        let (mut indx, mut indy, mut dist2) = (vec![], vec![], vec![]);
        calc_dist (&grid, &merged, &mut indi, &mut dist1);
        calc_dist2(&grid, &merged, &mut indx, &mut indy, &mut dist2);
        assert_eq!(dist1, dist2);
        let recombined: Vec<_> = indx.iter().zip(&indy).map(|(&x, &y)| grid.index1(x, y)).collect();
        assert_eq!(indi, recombined);
    }

    #[test]
    fn sum_of_squares() {
        assert_eq!(calc_sum_sqr(&[3.0, 4.0]), 25.0);
        assert_eq!(calc_sum_sqr(&[]), 0.0);
    }

    // --------------------------------------------------------------------------------
    use proptest::prelude::*;

    // Generate detector rays at arbitrary angles through arbitrary grids, and
    // verify the invariants of each stage.
    proptest! {
        #[test]
        fn pipeline_invariants(
            ry     in 1..60_usize,
            rz     in 1..60_usize,
            theta  in 0.0..(std::f32::consts::TAU),
            d_frac in 0.0..(1.0 as f32),
            shift  in -2.0..(2.0 as f32),
        ) {
            let dx = ry.max(rz) + 4;
            let grid = Grid::new(ry, rz, dx, 0.5 * (dx as f32 - 1.0) + shift).unwrap();
            let d = ((dx as f32 * d_frac) as usize).min(dx - 1);
            let ray = Ray::for_detector(&grid, theta, d, dx);
            let traversal = ray.traversal();

            let mut siddon = Siddon::new(&grid);
            let merged = siddon.intersections(&grid, &ray).clone();
            let trimmed = siddon.trimmed();

            // Trimmed points lie inside the grid
            let (x_lo, x_hi) = (grid.gridx[0], grid.gridx[ry]);
            let (y_lo, y_hi) = (grid.gridy[0], grid.gridy[rz]);
            for (x, y) in trimmed.ax.iter().zip(&trimmed.ay).chain(trimmed.bx.iter().zip(&trimmed.by)) {
                prop_assert!(*x >= x_lo && *x <= x_hi && *y >= y_lo && *y <= y_hi);
            }

            // Every trimmed point is merged, or collapsed into a vertex
            prop_assert_eq!(merged.csize() + merged.coincident, trimmed.len_a() + trimmed.len_b());

            // Strictly ordered along the major axis
            let keys: Vec<f32> = merged.points().map(|p| traversal.key(p)).collect();
            for w in keys.windows(2) { prop_assert!(w[1] > w[0], "{:?}", keys); }

            // Weights cover the whole chord, within valid pixels
            let (mut indi, mut dist) = (vec![], vec![]);
            calc_dist(&grid, &merged, &mut indi, &mut dist);
            prop_assert_eq!(dist.len(), merged.csize().saturating_sub(1));
            prop_assert!(indi.iter().all(|&i| i < grid.size()));
            prop_assert!(dist.iter().all(|&l| l >= 0.0));
            let summed: f32 = dist.iter().sum();
            assert_float_eq!(summed, ray.chord_length(&grid), r2nd <= 1e-5, abs <= 2e-4);
        }
    }
}
