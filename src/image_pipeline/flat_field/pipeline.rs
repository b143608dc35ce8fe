//! In-memory flat-field correction of one raw exposure.

use tracing::{debug, info, instrument};

use crate::image_pipeline::common::error::{CorrectionError, Result};
use crate::image_pipeline::flat_field::channels::{ChannelSet, ShadingMap};
use crate::image_pipeline::flat_field::codec;
use crate::image_pipeline::flat_field::corrector::{
    correct_color, correct_luminance, luma_shading_map, remove_luma_falloff,
};
use crate::image_pipeline::flat_field::executor::{ChannelExecutor, Executor};
use crate::image_pipeline::flat_field::range_ops;
use crate::image_pipeline::flat_field::settings::CorrectionSettings;
use crate::image_pipeline::flat_field::vignetting;
use crate::image_pipeline::raw::types::PixelBuffer;

/// Runs the correction stages on an explicit executor:
/// split, estimate shading, luminance, color, fit, reassemble.
pub struct FlatFieldCorrector<E: ChannelExecutor = Executor> {
    settings: CorrectionSettings,
    executor: E,
}

impl FlatFieldCorrector<Executor> {
    /// Validates the settings and builds the executor they ask for.
    pub fn new(settings: CorrectionSettings) -> Result<Self> {
        settings.validate()?;
        let executor = Executor::from_settings(settings.use_multithreading, settings.worker_threads)?;
        Ok(Self { settings, executor })
    }
}

impl<E: ChannelExecutor> FlatFieldCorrector<E> {
    pub fn with_executor(settings: CorrectionSettings, executor: E) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, executor })
    }

    pub fn settings(&self) -> &CorrectionSettings {
        &self.settings
    }

    fn check_buffer(buffer: &PixelBuffer) -> Result<()> {
        buffer.geometry.validate()?;
        let expected = buffer.geometry.sample_count();
        if buffer.data.len() != expected {
            return Err(CorrectionError::InvalidBufferLength {
                expected,
                actual: buffer.data.len(),
            });
        }
        Ok(())
    }

    /// Splits image and reference into black-subtracted planes, both cut to
    /// the image's active area.
    fn split_pair(&self, image: &PixelBuffer, reference: &PixelBuffer) -> (ChannelSet<u16>, ChannelSet<u16>) {
        let area = image.geometry.active_area;
        let mut sets = self
            .executor
            .map_channels(2, |i| match i {
                0 => codec::split_with_area(image, &area),
                _ => codec::split_with_area(reference, &area),
            })
            .into_iter();
        let (Some(channels), Some(reference_channels)) = (sets.next(), sets.next()) else {
            unreachable!("executor returned fewer results than tasks");
        };
        (channels, reference_channels)
    }

    fn estimate(&self, reference_channels: &ChannelSet<u16>) -> ShadingMap {
        vignetting::estimate(
            &reference_channels.to_f32(),
            self.settings.gaussian_filter_sigma,
            self.settings.normalization,
            &self.executor,
        )
    }

    /// Corrects `image` with the flat-field exposure `reference`.
    ///
    /// The returned buffer has the image's length and geometry; samples
    /// outside the active area are copied unchanged.
    #[instrument(skip_all, fields(
        layout = ?image.geometry.layout,
        width = image.geometry.width,
        height = image.geometry.height
    ))]
    pub fn process(&self, image: &PixelBuffer, reference: &PixelBuffer) -> Result<PixelBuffer> {
        Self::check_buffer(image)?;
        Self::check_buffer(reference)?;
        image.geometry.check_compatible(&reference.geometry)?;

        let geometry = &image.geometry;
        let color_pattern = geometry.color_pattern();

        let (channels, reference_channels) = {
            let _span = tracing::debug_span!("split").entered();
            self.split_pair(image, reference)
        };
        debug!(
            channels = channels.len(),
            plane_height = channels.plane_height(),
            plane_width = channels.plane_width(),
            "Split into channels"
        );

        let shading = {
            let _span = tracing::debug_span!("estimate_vignetting").entered();
            self.estimate(&reference_channels)
        };

        let (channels, shading) = {
            let _span = tracing::debug_span!("correct_luminance").entered();
            correct_luminance(
                channels.to_f32(),
                shading,
                &color_pattern,
                self.settings.luminance_correction_intensity,
                &self.executor,
            )
        };

        let channels = {
            let _span = tracing::debug_span!("correct_color").entered();
            correct_color(
                channels,
                &shading,
                &color_pattern,
                self.settings.color_correction_intensity,
                &self.executor,
            )
        };

        let fitted = {
            let _span = tracing::debug_span!("fit_range").entered();
            range_ops::fit(
                channels,
                &geometry.black_levels,
                &geometry.white_levels,
                self.settings.limit_to_white_levels,
                self.settings.scale_instead_of_clipping,
                &self.executor,
            )
        };

        let corrected = {
            let _span = tracing::debug_span!("reassemble").entered();
            codec::reassemble(&fitted, image)
        };

        info!(
            width = geometry.width,
            height = geometry.height,
            channels = color_pattern.len(),
            "Flat-field correction complete"
        );
        Ok(corrected)
    }

    /// Shading map the color stage divides by: blurred, normalized and with
    /// the shared luminance falloff removed from the non-green channels.
    #[instrument(skip_all)]
    pub fn shading_map(&self, reference: &PixelBuffer) -> Result<ShadingMap> {
        Self::check_buffer(reference)?;
        let reference_channels = codec::split(reference);
        let shading = self.estimate(&reference_channels);
        let color_pattern = reference.geometry.color_pattern();
        let luma = luma_shading_map(&shading, &color_pattern);
        Ok(remove_luma_falloff(shading, &luma, &color_pattern, &self.executor))
    }

    /// Shading map scaled to the full 16-bit range and laid out like the
    /// reference buffer, for inspection in an image viewer.
    pub fn shading_preview(&self, reference: &PixelBuffer) -> Result<PixelBuffer> {
        let shading = self.shading_map(reference)?;
        let scaled = shading.map_planes(|_, plane| {
            plane
                .iter()
                .map(|&v| (v * u16::MAX as f32).clamp(0.0, u16::MAX as f32) as u16)
                .collect()
        });
        Ok(codec::reassemble(&scaled, reference))
    }

    /// Keeps `bits` bits of every black-subtracted sample; see [`range_ops::bitwise_mask`].
    #[instrument(skip(self, image))]
    pub fn mask_bits(&self, image: &PixelBuffer, bits: i32, leave_lsb: bool) -> Result<PixelBuffer> {
        Self::check_buffer(image)?;
        Ok(range_ops::mask_image(image, bits, leave_lsb, &self.executor))
    }
}
