pub use crate::error::{Error, Result};
pub use crate::grid::{Grid, preprocessing};
pub use crate::ray::{Axis, Ray, Traversal};
pub use crate::siddon::{
    calc_coords, trim_coords, sort_intersections, calc_dist, calc_dist2, calc_sum_sqr,
    Crossings, Trimmed, Intersections, Siddon,
};
pub use crate::angle_data::{AngleData, RayKey, Scan};
pub use crate::projector::{Model, Plane, simulate, back_project, art_update};
pub use crate::exec::{ExecutionContext, TaskContext, Backend, Device};
pub use crate::config::Settings;
pub use crate::gpu::GpuOption;

pub use geometry::{Point, Vector};
