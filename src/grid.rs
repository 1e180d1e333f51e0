//! The discretized 2D reconstruction domain.

use geometry::Vector;
use crate::error::{Error, Result};

/// Unit-spaced coordinates of the grid lines of an `ry` x `rz` pixel grid,
/// centred on the origin, together with the offset `mov` which aligns detector
/// pixel centres with the rotation `center`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub ry: usize,
    pub rz: usize,
    pub mov: f32,
    pub gridx: Vec<f32>,
    pub gridy: Vec<f32>,
}

impl Grid {

    pub fn new(ry: usize, rz: usize, num_pixels: usize, center: f32) -> Result<Self> {
        let (mov, gridx, gridy) = preprocessing(ry, rz, num_pixels, center)?;
        Ok(Self { ry, rz, mov, gridx, gridy })
    }

    /// Number of pixels in the grid
    pub fn size(&self) -> usize { self.ry * self.rz }

    /// Upper bound on the number of line crossings of any single ray
    pub fn max_crossings(&self) -> usize { self.ry + self.rz + 2 }

    pub fn half_width(&self) -> Vector {
        Vector::new(0.5 * self.ry as f32, 0.5 * self.rz as f32)
    }

    /// Flattened index of the pixel in row `ix`, column `iy`
    #[inline]
    pub fn index1(&self, ix: usize, iy: usize) -> usize { ix * self.rz + iy }

    /// Row and column of the pixel with flattened index `i`
    #[inline]
    pub fn index2(&self, i: usize) -> (usize, usize) { (i / self.rz, i % self.rz) }
}

/// Compute the centring offset and the grid line coordinates.
///
/// When `center` leaves `mov` (almost) integral, it is nudged by 0.01 so that
/// detector rays do not run exactly along grid lines.
pub fn preprocessing(ry: usize, rz: usize, num_pixels: usize, center: f32) -> Result<(f32, Vec<f32>, Vec<f32>)> {
    if ry == 0 || rz == 0 { return Err(Error::EmptyGrid { ry, rz }) }

    let gridx = grid_lines(ry);
    let gridy = grid_lines(rz);

    let mut mov = (num_pixels as f32 - 1.0) * 0.5 - center;
    if mov - mov.floor() < 0.01 { mov += 0.01 }
    mov += 0.5;

    Ok((mov, gridx, gridy))
}

fn grid_lines(n: usize) -> Vec<f32> {
    let start = -0.5 * n as f32;
    (0..=n).map(|i| start + i as f32).collect()
}
