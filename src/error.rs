//! Error types for tomoray.

use thiserror::Error;

use crate::angle_data::RayKey;

/// Errors that can occur when setting up or driving projection passes.
///
/// Degenerate ray geometry (rays parallel to grid lines, rays missing the
/// grid, midpoints rounding onto the grid edge) is never an error: it produces
/// empty or clamped results.
#[derive(Error, Debug)]
pub enum Error {
    /// Grid with no pixels along at least one axis.
    #[error("grid must have at least one pixel along each axis, got {ry}x{rz}")]
    EmptyGrid { ry: usize, rz: usize },

    /// Model array whose shape cannot be indexed by this grid.
    #[error("model `{name}` has shape {found:?}, expected {expected:?}")]
    ModelShape { name: &'static str, found: [usize; 3], expected: [usize; 3] },

    /// Simulated data or reconstruction volume of the wrong shape.
    #[error("{name} has shape {found:?}, expected {expected:?}")]
    VolumeShape { name: &'static str, found: Vec<usize>, expected: Vec<usize> },

    /// Ray whose slice, angle or detector pixel lies outside the arrays of a pass.
    #[error("ray {key:?} lies outside {bounds:?} (slices, angles, detector pixels)")]
    RayOutOfRange { key: RayKey, bounds: [usize; 3] },

    /// `GPU_TYPE` named neither an index nor a key in the GPU registry.
    #[error("unknown GPU option `{0}`")]
    UnknownGpuOption(String),

    /// Environment variable with a value that could not be parsed.
    #[error("could not parse environment variable {var}={value}")]
    BadEnv { var: &'static str, value: String },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for tomoray operations.
pub type Result<T> = std::result::Result<T, Error>;
