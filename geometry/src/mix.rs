//! Conversions between our own types and those used by `parry2d`

use crate::{Point, Vector};

use parry2d::na;

impl From<na::Point2<f32>> for Point {
    fn from(p: na::Point2<f32>) -> Self { Self::new(p.x, p.y) }
}

impl From<Point> for na::Point2<f32> {
    fn from(p: Point) -> Self { Self::new(p.x, p.y) }
}

impl From<na::Vector2<f32>> for Vector {
    fn from(v: na::Vector2<f32>) -> Self { Self::new(v.x, v.y) }
}

impl From<Vector> for na::Vector2<f32> {
    fn from(v: Vector) -> Self { Self::new(v.x, v.y) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_nalgebra() {
        let p = Point::new(1.5, -2.5);
        let q: na::Point2<f32> = p.into();
        assert_eq!(Point::from(q), p);

        let v = Vector::new(-0.25, 8.0);
        let w: na::Vector2<f32> = v.into();
        assert_eq!(Vector::from(w), v);
    }
}
