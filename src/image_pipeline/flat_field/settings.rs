//! Flat-field correction settings

use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::error::{CorrectionError, Result};

/// Largest accepted blur sigma. The kernel spans `8 * sigma + 1` taps.
pub const MAX_GAUSSIAN_SIGMA: f32 = 1000.0;

/// How a blurred reference plane is scaled into a shading map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// Divide by the brightest sample of the plane.
    #[default]
    GlobalMax,
    /// Divide by the mean of a centered square window.
    CenterWindow { window: usize },
    /// Divide by the mean of the window around the brightest region, found
    /// by repeatedly halving the plane. Handles decentered lenses.
    BrightestWindow { window: usize },
}

/// Configuration for one correction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    /// Blend between no (0.0) and full (1.0) luminance correction
    pub luminance_correction_intensity: f32,
    /// Blend between no (0.0) and full (1.0) color shading correction
    pub color_correction_intensity: f32,
    /// Sigma of the Gaussian blur applied to the reference planes; 0 disables it
    pub gaussian_filter_sigma: f32,
    /// Scale all channels by one common factor instead of clipping each one
    pub scale_instead_of_clipping: bool,
    /// Clip at the sensor white level (true) or at 65535 (false)
    pub limit_to_white_levels: bool,
    /// Run per-channel stages on a worker pool
    pub use_multithreading: bool,
    /// Worker count for the pool, `None` for one per core
    pub worker_threads: Option<usize>,
    pub normalization: NormalizationPolicy,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            luminance_correction_intensity: 1.0,
            color_correction_intensity: 1.0,
            gaussian_filter_sigma: 50.0,
            scale_instead_of_clipping: false,
            limit_to_white_levels: true,
            use_multithreading: true,
            worker_threads: None,
            normalization: NormalizationPolicy::GlobalMax,
        }
    }
}

impl CorrectionSettings {
    pub fn builder() -> CorrectionSettingsBuilder {
        CorrectionSettingsBuilder::default()
    }

    /// Parses a JSON settings document. Unknown keys are ignored and missing
    /// keys keep their defaults; the result is validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: CorrectionSettings = serde_json::from_str(json)
            .map_err(|e| CorrectionError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CorrectionError::InvalidSettings(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("luminance_correction_intensity", self.luminance_correction_intensity),
            ("color_correction_intensity", self.color_correction_intensity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CorrectionError::InvalidSettings(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=MAX_GAUSSIAN_SIGMA).contains(&self.gaussian_filter_sigma) {
            return Err(CorrectionError::InvalidSettings(format!(
                "gaussian_filter_sigma must be within [0, {}], got {}",
                MAX_GAUSSIAN_SIGMA, self.gaussian_filter_sigma
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(CorrectionError::InvalidSettings(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        match self.normalization {
            NormalizationPolicy::CenterWindow { window: 0 }
            | NormalizationPolicy::BrightestWindow { window: 0 } => Err(
                CorrectionError::InvalidSettings("normalization window must be at least 1 pixel".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Builder for CorrectionSettings
#[derive(Default)]
pub struct CorrectionSettingsBuilder {
    luminance_correction_intensity: Option<f32>,
    color_correction_intensity: Option<f32>,
    gaussian_filter_sigma: Option<f32>,
    scale_instead_of_clipping: Option<bool>,
    limit_to_white_levels: Option<bool>,
    use_multithreading: Option<bool>,
    worker_threads: Option<Option<usize>>,
    normalization: Option<NormalizationPolicy>,
}

impl CorrectionSettingsBuilder {
    /// Starts from existing settings instead of the defaults.
    pub fn from_settings(settings: CorrectionSettings) -> Self {
        Self {
            luminance_correction_intensity: Some(settings.luminance_correction_intensity),
            color_correction_intensity: Some(settings.color_correction_intensity),
            gaussian_filter_sigma: Some(settings.gaussian_filter_sigma),
            scale_instead_of_clipping: Some(settings.scale_instead_of_clipping),
            limit_to_white_levels: Some(settings.limit_to_white_levels),
            use_multithreading: Some(settings.use_multithreading),
            worker_threads: Some(settings.worker_threads),
            normalization: Some(settings.normalization),
        }
    }

    pub fn luminance_correction_intensity(mut self, intensity: f32) -> Self {
        self.luminance_correction_intensity = Some(intensity);
        self
    }

    pub fn color_correction_intensity(mut self, intensity: f32) -> Self {
        self.color_correction_intensity = Some(intensity);
        self
    }

    pub fn gaussian_filter_sigma(mut self, sigma: f32) -> Self {
        self.gaussian_filter_sigma = Some(sigma);
        self
    }

    pub fn scale_instead_of_clipping(mut self, enable: bool) -> Self {
        self.scale_instead_of_clipping = Some(enable);
        self
    }

    pub fn limit_to_white_levels(mut self, enable: bool) -> Self {
        self.limit_to_white_levels = Some(enable);
        self
    }

    pub fn use_multithreading(mut self, enable: bool) -> Self {
        self.use_multithreading = Some(enable);
        self
    }

    pub fn worker_threads(mut self, threads: Option<usize>) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn normalization(mut self, policy: NormalizationPolicy) -> Self {
        self.normalization = Some(policy);
        self
    }

    pub fn build(self) -> CorrectionSettings {
        let default = CorrectionSettings::default();
        CorrectionSettings {
            luminance_correction_intensity: self
                .luminance_correction_intensity
                .unwrap_or(default.luminance_correction_intensity),
            color_correction_intensity: self
                .color_correction_intensity
                .unwrap_or(default.color_correction_intensity),
            gaussian_filter_sigma: self.gaussian_filter_sigma.unwrap_or(default.gaussian_filter_sigma),
            scale_instead_of_clipping: self
                .scale_instead_of_clipping
                .unwrap_or(default.scale_instead_of_clipping),
            limit_to_white_levels: self.limit_to_white_levels.unwrap_or(default.limit_to_white_levels),
            use_multithreading: self.use_multithreading.unwrap_or(default.use_multithreading),
            worker_threads: self.worker_threads.unwrap_or(default.worker_threads),
            normalization: self.normalization.unwrap_or(default.normalization),
        }
    }
}
