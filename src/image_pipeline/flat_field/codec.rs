//! Splitting raw buffers into color planes and putting them back together.
//!
//! Only the active area takes part in the correction. It is cut out of the
//! buffer, deinterleaved according to the sensor layout, and after the
//! correction the planes are interleaved in exactly the reverse order and
//! pasted back over a copy of the original buffer. Samples outside the
//! active area are never touched.

use crate::image_pipeline::flat_field::channels::ChannelSet;
use crate::image_pipeline::flat_field::range_ops::subtract_black;
use crate::image_pipeline::raw::types::{ActiveArea, Layout, PixelBuffer, SensorGeometry, level_for};

/// Layout-specific deinterleaving of the active area.
pub trait ChannelCodec: Sync {
    /// Splits `height` x `width` pixels of active-area samples into planes,
    /// clamping every sample to its channel's black level and subtracting it.
    fn split(&self, samples: &[u16], height: usize, width: usize, black_levels: &[u16]) -> ChannelSet<u16>;

    /// Exact inverse of `split` without the black level.
    fn interleave(&self, channels: &ChannelSet<u16>) -> Vec<u16>;
}

/// 2x2 color filter array: channel 0 even row/even column, 1 even/odd,
/// 2 odd/even, 3 odd/odd.
pub struct BayerCodec;

impl ChannelCodec for BayerCodec {
    fn split(&self, samples: &[u16], height: usize, width: usize, black_levels: &[u16]) -> ChannelSet<u16> {
        let (plane_height, plane_width) = (height / 2, width / 2);
        let blacks: [u16; 4] = std::array::from_fn(|i| level_for(black_levels, i));
        let mut planes: Vec<Vec<u16>> = (0..4)
            .map(|_| Vec::with_capacity(plane_height * plane_width))
            .collect();

        for pair in samples.chunks_exact(width * 2) {
            let (even_row, odd_row) = pair.split_at(width);
            for (row, first) in [(even_row, 0), (odd_row, 2)] {
                for block in row.chunks_exact(2) {
                    planes[first].push(subtract_black(block[0], blacks[first]));
                    planes[first + 1].push(subtract_black(block[1], blacks[first + 1]));
                }
            }
        }

        ChannelSet::new(planes, plane_height, plane_width)
    }

    fn interleave(&self, channels: &ChannelSet<u16>) -> Vec<u16> {
        let plane_width = channels.plane_width();
        let width = plane_width * 2;
        let mut samples = Vec::with_capacity(channels.plane_height() * 2 * width);

        for y in 0..channels.plane_height() {
            let span = y * plane_width..(y + 1) * plane_width;
            // even row from channels 0/1, odd row from channels 2/3
            for first in [0, 2] {
                let left = &channels.plane(first)[span.clone()];
                let right = &channels.plane(first + 1)[span.clone()];
                for (&a, &b) in left.iter().zip(right) {
                    samples.push(a);
                    samples.push(b);
                }
            }
        }
        samples
    }
}

/// Pixel-interleaved R, G, B samples.
pub struct LinearRgbCodec;

impl ChannelCodec for LinearRgbCodec {
    fn split(&self, samples: &[u16], height: usize, width: usize, black_levels: &[u16]) -> ChannelSet<u16> {
        let planes = (0..3)
            .map(|channel| {
                let black = level_for(black_levels, channel);
                samples
                    .iter()
                    .skip(channel)
                    .step_by(3)
                    .map(|&v| subtract_black(v, black))
                    .collect()
            })
            .collect();
        ChannelSet::new(planes, height, width)
    }

    fn interleave(&self, channels: &ChannelSet<u16>) -> Vec<u16> {
        let (r, g, b) = (channels.plane(0), channels.plane(1), channels.plane(2));
        r.iter()
            .zip(g)
            .zip(b)
            .flat_map(|((&r, &g), &b)| [r, g, b])
            .collect()
    }
}

/// One sample per pixel, the plane is the active area itself.
pub struct MonochromeCodec;

impl ChannelCodec for MonochromeCodec {
    fn split(&self, samples: &[u16], height: usize, width: usize, black_levels: &[u16]) -> ChannelSet<u16> {
        let black = level_for(black_levels, 0);
        let plane = samples.iter().map(|&v| subtract_black(v, black)).collect();
        ChannelSet::new(vec![plane], height, width)
    }

    fn interleave(&self, channels: &ChannelSet<u16>) -> Vec<u16> {
        channels.plane(0).to_vec()
    }
}

pub fn codec_for(layout: Layout) -> &'static dyn ChannelCodec {
    match layout {
        Layout::Bayer => &BayerCodec,
        Layout::LinearRgb => &LinearRgbCodec,
        Layout::Monochrome => &MonochromeCodec,
    }
}

/// Copies the active area out of a full buffer.
pub fn active_area_samples(data: &[u16], geometry: &SensorGeometry, area: &ActiveArea) -> Vec<u16> {
    let spp = geometry.layout.samples_per_pixel();
    let stride = geometry.width * spp;
    let mut samples = Vec::with_capacity(area.height() * area.width() * spp);
    for y in area.top..area.bottom {
        let row = y * stride;
        samples.extend_from_slice(&data[row + area.left * spp..row + area.right * spp]);
    }
    samples
}

/// Writes active-area samples back into a full buffer.
pub fn set_active_area_samples(data: &mut [u16], samples: &[u16], geometry: &SensorGeometry, area: &ActiveArea) {
    let spp = geometry.layout.samples_per_pixel();
    let stride = geometry.width * spp;
    let row_len = area.width() * spp;
    for (i, row_samples) in samples.chunks_exact(row_len).enumerate() {
        let row = (area.top + i) * stride;
        data[row + area.left * spp..row + area.right * spp].copy_from_slice(row_samples);
    }
}

/// Splits a buffer into black-subtracted planes.
///
/// `area` is normally the buffer's own active area; the reference exposure
/// is split with the image's area so both sets line up.
pub fn split_with_area(buffer: &PixelBuffer, area: &ActiveArea) -> ChannelSet<u16> {
    let geometry = &buffer.geometry;
    let samples = active_area_samples(&buffer.data, geometry, area);
    codec_for(geometry.layout).split(&samples, area.height(), area.width(), &geometry.black_levels)
}

pub fn split(buffer: &PixelBuffer) -> ChannelSet<u16> {
    split_with_area(buffer, &buffer.geometry.active_area)
}

/// Interleaves corrected planes over a copy of `original`. The planes must
/// already carry their black level; this is the inverse of the layout
/// shuffle only.
pub fn reassemble(channels: &ChannelSet<u16>, original: &PixelBuffer) -> PixelBuffer {
    let geometry = &original.geometry;
    assert_eq!(channels.len(), geometry.channel_count(), "channel count does not match layout");
    let samples = codec_for(geometry.layout).interleave(channels);
    let mut data = original.data.clone();
    set_active_area_samples(&mut data, &samples, geometry, &geometry.active_area);
    PixelBuffer {
        data,
        geometry: geometry.clone(),
    }
}

#[cfg(test)]
mod tests;
