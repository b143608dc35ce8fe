//! Image processing pipeline module
//!
//! Flat-field correction of raw sensor data, with separate modules for RAW
//! reading, the correction engine itself, TIFF writing, and the
//! orchestration that ties them together.

pub mod raw;
pub mod flat_field;
pub mod tiff;
pub mod conversions;
pub mod common;

pub use common::{
    CorrectionError,
    Result,
};

pub use raw::{
    ActiveArea,
    Layout,
    PixelBuffer,
    RawImageReader,
    RawLoaderReader,
    SensorGeometry,
};

pub use flat_field::{
    CorrectionSettings,
    CorrectionSettingsBuilder,
    FlatFieldCorrector,
    NormalizationPolicy,
};

pub use tiff::{
    OutputConfig,
    OutputConfigBuilder,
    StandardTiffWriter,
    TiffCompression,
    TiffWriter,
};

pub use conversions::RawCorrectionPipeline;
