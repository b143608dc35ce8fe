//! RAW image data types

use crate::image_pipeline::common::error::{CorrectionError, Result};

/// Color role of a channel inside a color pattern.
pub const ROLE_RED: u8 = 0;
/// Green channels carry luminance and drive the shared vignetting map.
pub const ROLE_LUMA: u8 = 1;
pub const ROLE_BLUE: u8 = 2;

/// Bayer pattern used when the metadata does not carry one.
pub const DEFAULT_BAYER_PATTERN: [u8; 4] = [ROLE_RED, ROLE_LUMA, ROLE_LUMA, ROLE_BLUE];

/// DNG photometric interpretation of mosaiced sensor data.
pub const PHOTOMETRIC_CFA: &str = "Color Filter Array";
/// DNG photometric interpretation of demosaiced or monochrome linear data.
pub const PHOTOMETRIC_LINEAR_RAW: &str = "Linear Raw";

/// Physical arrangement of the samples in a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Single-sample photosites under a 2x2 color filter array.
    Bayer,
    /// Three interleaved samples per pixel (R, G, B).
    LinearRgb,
    /// One sample per pixel, no color filter.
    Monochrome,
}

impl Layout {
    /// Derives the layout from the photometric interpretation and
    /// samples-per-pixel tags of the raw IFD.
    pub fn from_photometric(photometric_interpretation: &str, samples_per_pixel: u32) -> Result<Self> {
        match (photometric_interpretation.trim(), samples_per_pixel) {
            (PHOTOMETRIC_CFA, 1) => Ok(Layout::Bayer),
            (PHOTOMETRIC_LINEAR_RAW, 3) => Ok(Layout::LinearRgb),
            (PHOTOMETRIC_LINEAR_RAW, 1) => Ok(Layout::Monochrome),
            (other, spp) => Err(CorrectionError::UnsupportedLayout(format!(
                "{} with {} samples per pixel",
                other, spp
            ))),
        }
    }

    /// Number of color planes the layout splits into.
    pub fn channel_count(self) -> usize {
        match self {
            Layout::Bayer => 4,
            Layout::LinearRgb => 3,
            Layout::Monochrome => 1,
        }
    }

    /// Samples stored per pixel position.
    pub fn samples_per_pixel(self) -> usize {
        match self {
            Layout::LinearRgb => 3,
            Layout::Bayer | Layout::Monochrome => 1,
        }
    }
}

/// Rectangle of valid image data, `[top, bottom)` x `[left, right)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveArea {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl ActiveArea {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self { top, left, bottom, right }
    }

    /// Active area spanning the whole buffer.
    pub fn full(height: usize, width: usize) -> Self {
        Self::new(0, 0, height, width)
    }

    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }

    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }
}

/// Level value for a channel from a 0/1/N-entry level list.
pub fn level_for(levels: &[u16], channel: usize) -> u16 {
    match levels.len() {
        0 => 0,
        1 => levels[0],
        _ => levels.get(channel).copied().unwrap_or(levels[levels.len() - 1]),
    }
}

/// Sensor geometry and levels of one raw exposure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorGeometry {
    /// Height of the raw buffer in pixels
    pub height: usize,
    /// Width of the raw buffer in pixels
    pub width: usize,
    pub active_area: ActiveArea,
    /// Black levels: empty, one shared value, or one per channel
    pub black_levels: Vec<u16>,
    /// White levels, same convention as `black_levels`
    pub white_levels: Vec<u16>,
    /// Color role per channel index (Bayer only, see `color_pattern()`)
    pub cfa_pattern: Vec<u8>,
    pub layout: Layout,
}

impl SensorGeometry {
    /// Geometry with the full buffer active, no black level and a 16-bit white level.
    pub fn new(layout: Layout, height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            active_area: ActiveArea::full(height, width),
            black_levels: Vec::new(),
            white_levels: vec![u16::MAX],
            cfa_pattern: DEFAULT_BAYER_PATTERN.to_vec(),
            layout,
        }
    }

    pub fn with_active_area(mut self, active_area: ActiveArea) -> Self {
        self.active_area = active_area;
        self
    }

    pub fn with_black_levels(mut self, levels: Vec<u16>) -> Self {
        self.black_levels = levels;
        self
    }

    pub fn with_white_levels(mut self, levels: Vec<u16>) -> Self {
        self.white_levels = levels;
        self
    }

    pub fn with_cfa_pattern(mut self, pattern: Vec<u8>) -> Self {
        self.cfa_pattern = pattern;
        self
    }

    pub fn channel_count(&self) -> usize {
        self.layout.channel_count()
    }

    /// Color role per channel for this layout.
    pub fn color_pattern(&self) -> Vec<u8> {
        match self.layout {
            Layout::Bayer => self.cfa_pattern.clone(),
            Layout::LinearRgb => vec![ROLE_RED, ROLE_LUMA, ROLE_BLUE],
            Layout::Monochrome => vec![ROLE_LUMA],
        }
    }

    pub fn black_level(&self, channel: usize) -> u16 {
        level_for(&self.black_levels, channel)
    }

    /// White level of a channel; an empty list means the full 16-bit range.
    pub fn white_level(&self, channel: usize) -> u16 {
        if self.white_levels.is_empty() {
            u16::MAX
        } else {
            level_for(&self.white_levels, channel)
        }
    }

    /// Number of u16 samples the buffer must hold.
    pub fn sample_count(&self) -> usize {
        self.height * self.width * self.layout.samples_per_pixel()
    }

    /// Checks that the active area fits the buffer and splits evenly.
    pub fn validate(&self) -> Result<()> {
        let area = &self.active_area;
        if self.height == 0 || self.width == 0 {
            return Err(CorrectionError::InvalidDimensions(self.width, self.height));
        }
        if area.top >= area.bottom || area.left >= area.right
            || area.bottom > self.height || area.right > self.width
        {
            return Err(CorrectionError::InvalidDimensions(area.width(), area.height()));
        }
        if self.layout == Layout::Bayer {
            if area.height() % 2 != 0 || area.width() % 2 != 0 {
                return Err(CorrectionError::InvalidDimensions(area.width(), area.height()));
            }
            if self.cfa_pattern.len() != 4 {
                return Err(CorrectionError::UnsupportedLayout(format!(
                    "CFA pattern with {} entries",
                    self.cfa_pattern.len()
                )));
            }
        }
        let luma_channels = self.color_pattern().iter().filter(|&&role| role == ROLE_LUMA).count();
        if luma_channels == 0 {
            return Err(CorrectionError::UnsupportedLayout(
                "color pattern has no green channel".to_string(),
            ));
        }
        Ok(())
    }

    /// Verifies that a reference exposure can be used to correct this one.
    /// Levels may differ, the sample layout may not.
    pub fn check_compatible(&self, reference: &SensorGeometry) -> Result<()> {
        if self.layout != reference.layout {
            return Err(CorrectionError::GeometryMismatch(format!(
                "layout {:?} vs {:?}",
                self.layout, reference.layout
            )));
        }
        if self.height != reference.height || self.width != reference.width {
            return Err(CorrectionError::GeometryMismatch(format!(
                "size {}x{} vs {}x{}",
                self.width, self.height, reference.width, reference.height
            )));
        }
        if self.active_area != reference.active_area {
            return Err(CorrectionError::GeometryMismatch(format!(
                "active area {:?} vs {:?}",
                self.active_area, reference.active_area
            )));
        }
        if self.color_pattern() != reference.color_pattern() {
            return Err(CorrectionError::GeometryMismatch(format!(
                "color pattern {:?} vs {:?}",
                self.color_pattern(),
                reference.color_pattern()
            )));
        }
        Ok(())
    }
}

/// Raw sample buffer of one exposure together with its geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub data: Vec<u16>,
    pub geometry: SensorGeometry,
}

impl PixelBuffer {
    pub fn new(data: Vec<u16>, geometry: SensorGeometry) -> Result<Self> {
        geometry.validate()?;
        let expected = geometry.sample_count();
        if data.len() != expected {
            return Err(CorrectionError::InvalidBufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, geometry })
    }
}
