//! TIFF output configuration types

use std::str::FromStr;

use crate::image_pipeline::common::error::CorrectionError;

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

impl FromStr for TiffCompression {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TiffCompression::None),
            "lzw" => Ok(TiffCompression::Lzw),
            "deflate-fast" => Ok(TiffCompression::DeflateFast),
            "deflate" | "deflate-balanced" => Ok(TiffCompression::DeflateBalanced),
            "deflate-best" => Ok(TiffCompression::DeflateBest),
            other => Err(CorrectionError::InvalidSettings(format!(
                "unknown compression '{}'",
                other
            ))),
        }
    }
}

/// Configuration for writing corrected images
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Write only the active area instead of the whole sensor buffer
    pub crop_to_active_area: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            crop_to_active_area: false,
        }
    }
}

impl OutputConfig {
    pub fn builder() -> OutputConfigBuilder {
        OutputConfigBuilder::default()
    }
}

/// Builder for OutputConfig
#[derive(Default)]
pub struct OutputConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    crop_to_active_area: Option<bool>,
}

impl OutputConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn crop_to_active_area(mut self, crop: bool) -> Self {
        self.crop_to_active_area = Some(crop);
        self
    }

    pub fn build(self) -> OutputConfig {
        let default = OutputConfig::default();
        OutputConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            crop_to_active_area: self.crop_to_active_area.unwrap_or(default.crop_to_active_area),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OutputConfig::builder()
            .compression(TiffCompression::Lzw)
            .predictor(Some(2))
            .crop_to_active_area(true)
            .build();

        assert_eq!(config.compression, TiffCompression::Lzw);
        assert_eq!(config.predictor, Some(2));
        assert!(config.crop_to_active_area);
    }

    #[test]
    fn test_builder_defaults() {
        let config = OutputConfig::builder().build();
        assert_eq!(config.compression, TiffCompression::None);
        assert_eq!(config.predictor, None);
        assert!(!config.crop_to_active_area);
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!("LZW".parse::<TiffCompression>().unwrap(), TiffCompression::Lzw);
        assert_eq!("deflate".parse::<TiffCompression>().unwrap(), TiffCompression::DeflateBalanced);
        assert!("zip".parse::<TiffCompression>().is_err());
    }
}
