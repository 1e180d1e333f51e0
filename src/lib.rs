mod exports;
pub use exports::*;

pub mod error;
pub mod grid;
pub mod ray;
pub mod siddon;
pub mod angle_data;
pub mod projector;
pub mod exec;
pub mod gpu;
pub mod config;
pub mod debug;
pub mod utils;
