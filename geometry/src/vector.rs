use std::ops::Mul;
use crate::Lengthf32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector {
    pub x: Lengthf32,
    pub y: Lengthf32,
}

impl Mul<f32> for Vector {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self::Output {
        Vector {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Vector {

    pub fn new(x: Lengthf32, y: Lengthf32) -> Self { Self { x, y } }

    pub fn magnitude(&self) -> Lengthf32 {
        let &Self { x, y } = self;
        (x*x + y*y).sqrt()
    }

    pub fn norm(self) -> Lengthf32 { self.magnitude() }

    /// Unit vector in the same direction. The zero vector is returned unchanged.
    pub fn normalize(self) -> Self {
        let m = self.magnitude();
        if m == 0.0 { self } else { self * (1.0 / m) }
    }

}
