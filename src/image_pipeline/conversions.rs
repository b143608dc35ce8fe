//! Pipeline conversions module
//!
//! Orchestrates decoding, flat-field correction and encoding of whole files.

mod raw_correction;

pub use raw_correction::RawCorrectionPipeline;

#[cfg(test)]
mod tests;
