//! Pixel grids and the encoder that turns them into files

pub mod bitmap;
pub mod png;

pub use png::PngEncoder;
