mod point;
mod vector;

pub use point::Point;
pub use vector::Vector;

mod mix;
mod chord;

pub use chord::{box_chord_length, box_entry};

/// Lengths in this crate are measured in units of grid pixels
pub type Lengthf32 = f32;
