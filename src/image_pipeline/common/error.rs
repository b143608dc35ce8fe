use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("Image and reference are not compatible: {0}")]
    GeometryMismatch(String),

    #[error("Pixel buffer length mismatch: expected {expected} samples, got {actual}")]
    InvalidBufferLength { expected: usize, actual: usize },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported sensor layout: {0}")]
    UnsupportedLayout(String),

    #[error("Invalid correction settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CorrectionError>;
