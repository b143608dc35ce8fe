use std::io::Write;
use tiff::encoder::colortype::{Gray16, RGB16};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::common::error::{CorrectionError, Result};
use crate::image_pipeline::flat_field::codec::active_area_samples;
use crate::image_pipeline::raw::types::{Layout, PixelBuffer};
use crate::image_pipeline::tiff::types::{OutputConfig, TiffCompression};
use crate::image_pipeline::tiff::writer::TiffWriter;

pub struct StandardTiffWriter;

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &PixelBuffer, output: &mut dyn Write, config: &OutputConfig) -> Result<()> {
        let geometry = &image.geometry;
        let (width, height, samples) = if config.crop_to_active_area {
            let area = &geometry.active_area;
            (area.width(), area.height(), active_area_samples(&image.data, geometry, area))
        } else {
            (geometry.width, geometry.height, image.data.clone())
        };
        debug!("Encoding TIFF image: {}x{} ({:?})", width, height, geometry.layout);

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| CorrectionError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let written = match geometry.layout {
            Layout::LinearRgb => encoder.write_image::<RGB16>(width as u32, height as u32, &samples),
            Layout::Bayer | Layout::Monochrome => {
                encoder.write_image::<Gray16>(width as u32, height as u32, &samples)
            }
        };
        written.map_err(|e| CorrectionError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
