use std::ops::{Add, Sub};
use crate::{Lengthf32, Vector};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: Lengthf32,
    pub y: Lengthf32,
}

impl Point {
    pub fn new(x: Lengthf32, y: Lengthf32) -> Self { Self { x, y } }

    pub fn origin() -> Self { Self::new(0.0, 0.0) }

    /// Rotate about the origin by the angle whose sine and cosine are given
    pub fn rotated(self, sin: f32, cos: f32) -> Self {
        let Self { x, y } = self;
        Self::new(x * cos - y * sin,
                  x * sin + y * cos)
    }

    /// Point halfway between `self` and `other`
    pub fn midpoint(self, other: Self) -> Self {
        Self::new(0.5 * (self.x + other.x),
                  0.5 * (self.y + other.y))
    }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, rhs: Self) -> Self::Output {
        Vector {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, rhs: Vector) -> Self::Output {
        Point {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub<Vector> for Point {
    type Output = Point;
    fn sub(self, rhs: Vector) -> Self::Output {
        Point {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
