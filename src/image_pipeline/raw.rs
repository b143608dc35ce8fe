//! RAW image reading module
//!
//! This module provides format-agnostic RAW image reading capabilities,
//! the sensor geometry types the correction engine works on, and direct
//! access to the sample strip of an uncompressed raw file.

mod reader;
mod rawloader_reader;
pub mod io;
pub mod types;

pub use reader::RawImageReader;
pub use rawloader_reader::RawLoaderReader;
pub use types::{ActiveArea, Layout, PixelBuffer, SensorGeometry, level_for};
