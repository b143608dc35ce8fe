//! RAW image reader implementation using the rawloader library.
//!
//! Decodes any format rawloader understands and maps its metadata onto a
//! [`SensorGeometry`]: crops become the active area, the per-channel black
//! and white levels are carried over and the 2x2 CFA is translated into
//! color roles relative to the top-left corner of the active area.

use std::io::Cursor;

use tracing::debug;
use rawloader::RawImageData as RawloaderImageData;
use crate::image_pipeline::common::error::{Result, CorrectionError};
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{
    ActiveArea, Layout, PixelBuffer, SensorGeometry, PHOTOMETRIC_CFA, PHOTOMETRIC_LINEAR_RAW,
    ROLE_BLUE, ROLE_LUMA, ROLE_RED,
};

/// RAW image reader that uses the rawloader library for decoding.
pub struct RawLoaderReader;

/// rawloader color index for the second green ("emerald") filter.
const RAWLOADER_EMERALD: usize = 3;

fn color_role(rawloader_color: usize) -> u8 {
    match rawloader_color {
        0 => ROLE_RED,
        2 => ROLE_BLUE,
        // green and emerald both count as luminance
        _ => ROLE_LUMA,
    }
}

/// rawloader reports single-component data with a valid CFA as mosaiced;
/// everything else is linear raw.
fn layout_for(components: usize, has_cfa: bool) -> Result<Layout> {
    let photometric = if components == 1 && has_cfa {
        PHOTOMETRIC_CFA
    } else {
        PHOTOMETRIC_LINEAR_RAW
    };
    Layout::from_photometric(photometric, components as u32)
}

impl RawImageReader for RawLoaderReader {
    fn read_raw(&self, data: &[u8]) -> Result<PixelBuffer> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| CorrectionError::DecodeError(e.to_string()))?;

        let width = decoded.width;
        let height = decoded.height;

        debug!("Decoded image: {}x{}, {} components per pixel", width, height, decoded.cpp);

        let layout = layout_for(decoded.cpp, decoded.cfa.is_valid())?;

        // Integer data is cast directly, float data (normalized 0.0-1.0) is scaled to u16 range
        let samples: Vec<u16> = match decoded.data {
            RawloaderImageData::Integer(values) => values,
            RawloaderImageData::Float(values) => {
                values.iter().map(|&v| (v * u16::MAX as f32) as u16).collect()
            }
        };

        // crops are [top, right, bottom, left] margins
        let [crop_top, crop_right, crop_bottom, crop_left] = decoded.crops;
        let mut active_area = ActiveArea::new(
            crop_top,
            crop_left,
            height.saturating_sub(crop_bottom),
            width.saturating_sub(crop_right),
        );
        if layout == Layout::Bayer {
            // keep whole 2x2 blocks
            active_area.bottom -= active_area.height() % 2;
            active_area.right -= active_area.width() % 2;
        }

        let cfa_pattern = if layout == Layout::Bayer {
            let (top, left) = (active_area.top, active_area.left);
            let pattern = [(0, 0), (0, 1), (1, 0), (1, 1)]
                .iter()
                .map(|&(dy, dx)| {
                    let color = decoded.cfa.color_at(top + dy, left + dx);
                    if color == RAWLOADER_EMERALD {
                        debug!("Emerald filter at ({}, {}) treated as green", top + dy, left + dx);
                    }
                    color_role(color)
                })
                .collect();
            debug!("CFA {} mapped to color pattern {:?}", decoded.cfa.name, pattern);
            pattern
        } else {
            Vec::new()
        };

        let levels_len = layout.channel_count();
        let geometry = SensorGeometry {
            height,
            width,
            active_area,
            black_levels: decoded.blacklevels[..levels_len].to_vec(),
            white_levels: decoded.whitelevels[..levels_len].to_vec(),
            cfa_pattern,
            layout,
        };

        debug!(
            "Levels: black {:?}, white {:?}, active area {:?}",
            geometry.black_levels, geometry.white_levels, geometry.active_area
        );

        PixelBuffer::new(samples, geometry)
    }
}
