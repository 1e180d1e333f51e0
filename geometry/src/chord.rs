use parry2d::query::{Ray, RayCast};
use parry2d::shape::Cuboid;
use parry2d::math::Isometry;

use crate::{Lengthf32, Point, Vector};

/// Point at which the segment from `p1` to `p2` first enters the axis-aligned
/// box of half-widths `half_width` centred on the origin.
pub fn box_entry(half_width: Vector, p1: Point, p2: Point) -> Option<Point> {
    let direction = (p2 - p1).normalize();
    let length    = (p2 - p1).norm();
    let ray = Ray::new(p1.into(), direction.into());
    Cuboid::new(half_width.into())
        .cast_ray(&Isometry::identity(), &ray, length, true)
        .map(|toi| ray.point_at(toi))
        .map(Into::into)
}

/// Length of the chord cut by the infinite line through `through`, with
/// direction `direction`, on the axis-aligned box of half-widths `half_width`
/// centred on the origin. Zero if the line misses the box.
pub fn box_chord_length(half_width: Vector, through: Point, direction: Vector) -> Lengthf32 {
    let direction = direction.normalize();
    if direction.magnitude() == 0.0 { return 0.0 }
    // Far enough along the line to be outside the box in both directions
    let reach = (through - Point::origin()).magnitude() + 2.0 * half_width.magnitude() + 1.0;
    let p1 = through - direction * reach;
    let p2 = through + direction * reach;
    match (box_entry(half_width, p1, p2), box_entry(half_width, p2, p1)) {
        (Some(a), Some(b)) => (a - b).magnitude(),
        _ => 0.0,
    }
}
