//! TIFF writing module
//!
//! Corrected buffers, bit-mask diagnostics and shading previews are written
//! as 16-bit TIFFs: one gray plane for Bayer and monochrome data, interleaved
//! RGB for linear raw.

mod writer;
mod standard_tiff_writer;
pub mod types;

pub use writer::TiffWriter;
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{OutputConfig, OutputConfigBuilder, TiffCompression};
