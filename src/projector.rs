//! Forward projection (simulation) and back-projection of single rays.
//!
//! The model being projected may be
//!
//! + a single volume,
//!
//! + a weighted blend of two volumes (models decomposed along two planes),
//!
//! + a weighted blend of two of three volumes, the pair and their indexing
//!   being selected by an axis (volumetric models with an axis-dependent
//!   basis).
//!
//! All three are represented by `Model`, so that the projection loops exist
//! only once. Which variant is used is the caller's choice.

/// Which pair of volumes a `Model::Triple` blends, and how it indexes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane { X, Y, Z }

/// The current estimate of the reconstruction, as seen by the projector.
///
/// Volumes have shape `(n, ry, rz)`. `Single` and `Dual` are indexed
/// `[slice, row, column]`; `Triple` requires cubic volumes.
#[derive(Clone, Copy, Debug)]
pub enum Model<'m> {
    Single(ArrayView3<'m, f32>),
    Dual {
        vx: f32,
        vy: f32,
        modelx: ArrayView3<'m, f32>,
        modely: ArrayView3<'m, f32>,
    },
    Triple {
        vx: f32,
        vy: f32,
        modelx: ArrayView3<'m, f32>,
        modely: ArrayView3<'m, f32>,
        modelz: ArrayView3<'m, f32>,
        axis: Plane,
    },
}

impl<'m> Model<'m> {

    pub fn single(grid: &Grid, model: ArrayView3<'m, f32>) -> Result<Self> {
        check_model_shape(grid, "model", model)?;
        Ok(Self::Single(model))
    }

    pub fn dual(grid: &Grid, vx: f32, vy: f32, modelx: ArrayView3<'m, f32>, modely: ArrayView3<'m, f32>) -> Result<Self> {
        check_model_shape(grid, "modelx", modelx)?;
        check_same_shape("modely", modely, modelx)?;
        Ok(Self::Dual { vx, vy, modelx, modely })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn triple(
        grid: &Grid,
        vx: f32,
        vy: f32,
        modelx: ArrayView3<'m, f32>,
        modely: ArrayView3<'m, f32>,
        modelz: ArrayView3<'m, f32>,
        axis: Plane,
    ) -> Result<Self> {
        check_model_shape(grid, "modelx", modelx)?;
        let n = grid.ry;
        if modelx.dim() != (n, n, n) {
            let (a, b, c) = modelx.dim();
            return Err(Error::ModelShape { name: "modelx", found: [a, b, c], expected: [n, n, n] });
        }
        check_same_shape("modely", modely, modelx)?;
        check_same_shape("modelz", modelz, modelx)?;
        Ok(Self::Triple { vx, vy, modelx, modely, modelz, axis })
    }

    /// Number of slices which can be projected
    pub fn slices(&self) -> usize {
        match self {
            Self::Single(m) | Self::Dual { modelx: m, .. } | Self::Triple { modelx: m, .. } => m.dim().0,
        }
    }

    /// Value of the model in pixel (`ix`, `iy`) of slice `s`
    #[inline]
    pub fn value(&self, s: usize, ix: usize, iy: usize) -> f32 {
        match *self {
            Self::Single(m) => m[[s, ix, iy]],
            Self::Dual { vx, vy, modelx, modely } =>
                vx * modelx[[s, ix, iy]] + vy * modely[[s, ix, iy]],
            Self::Triple { vx, vy, modelx, modely, modelz, axis } => match axis {
                Plane::X => vx * modelx[[s, ix, iy]] + vy * modely[[s, ix, iy]],
                Plane::Y => vx * modely[[iy, ix, s]] + vy * modelz[[iy, ix, s]],
                Plane::Z => vx * modelx[[iy, s, ix]] + vy * modelz[[iy, s, ix]],
            },
        }
    }

    /// Sum of the model along the ray, weighted by path length
    pub fn ray_sum(&self, grid: &Grid, ray: &AngleData) -> f32 {
        let mut projection = 0.0;
        for (i, w) in ray.iter() {
            let (ix, iy) = grid.index2(i);
            projection += w * self.value(ray.s, ix, iy);
        }
        projection
    }
}

/// Forward-project `model` along `ray`, accumulating into the ray's cell of
/// `simdata` (indexed `[slice, angle, detector pixel]`). Returns the
/// contribution of this ray.
pub fn simulate(grid: &Grid, ray: &AngleData, model: &Model, mut simdata: ArrayViewMut3<f32>) -> f32 {
    let projection = model.ray_sum(grid, ray);
    simdata[[ray.s, ray.p, ray.d]] += projection;
    projection
}

/// Spread `update` along `ray` into `recon` (indexed `[slice, row, column]`),
/// in proportion to the path length in each pixel.
pub fn back_project(grid: &Grid, ray: &AngleData, update: f32, mut recon: ArrayViewMut3<f32>) {
    for (i, w) in ray.iter() {
        let (ix, iy) = grid.index2(i);
        recon[[ray.s, ix, iy]] += update * w;
    }
}

/// Normalized algebraic update for one ray: the residual divided by the sum of
/// the squared weights. Rays which miss the grid contribute nothing.
pub fn art_update(measured: f32, simulated: f32, sum_dist_sqr: f32) -> f32 {
    if sum_dist_sqr > 0.0 { (measured - simulated) / sum_dist_sqr } else { 0.0 }
}

fn check_model_shape(grid: &Grid, name: &'static str, model: ArrayView3<f32>) -> Result<()> {
    let (n, ry, rz) = model.dim();
    if n == 0 || ry != grid.ry || rz != grid.rz {
        return Err(Error::ModelShape { name, found: [n, ry, rz], expected: [n.max(1), grid.ry, grid.rz] })
    }
    Ok(())
}

fn check_same_shape(name: &'static str, model: ArrayView3<f32>, reference: ArrayView3<f32>) -> Result<()> {
    if model.dim() != reference.dim() {
        let (a, b, c) = model.dim();
        let (x, y, z) = reference.dim();
        return Err(Error::ModelShape { name, found: [a, b, c], expected: [x, y, z] })
    }
    Ok(())
}

// ----- Imports ------------------------------------------------------------------------------------------
use ndarray::{ArrayView3, ArrayViewMut3};

use crate::{
    angle_data::AngleData,
    error::{Error, Result},
    grid::Grid,
};
