//! Black/white level handling and bit masking of color planes.

use tracing::debug;

use crate::image_pipeline::flat_field::channels::{ChannelSet, plane_max};
use crate::image_pipeline::flat_field::codec;
use crate::image_pipeline::flat_field::executor::ChannelExecutor;
use crate::image_pipeline::raw::types::{PixelBuffer, level_for};

/// Removes the black level from one sample. Samples below the black level
/// clamp to zero instead of wrapping.
#[inline]
pub fn subtract_black(value: u16, black: u16) -> u16 {
    value.max(black) - black
}

/// Restores the per-channel black level.
pub fn add_black(channels: ChannelSet<f32>, black_levels: &[u16]) -> ChannelSet<f32> {
    channels.map_planes(|i, mut plane| {
        let black = level_for(black_levels, i) as f32;
        if black != 0.0 {
            plane.iter_mut().for_each(|v| *v += black);
        }
        plane
    })
}

/// Integer variant of [`add_black`], saturating at 65535.
pub fn add_black_u16(channels: ChannelSet<u16>, black_levels: &[u16]) -> ChannelSet<u16> {
    channels.map_planes(|i, mut plane| {
        let black = level_for(black_levels, i);
        plane.iter_mut().for_each(|v| *v = v.saturating_add(black));
        plane
    })
}

/// Upper bound a channel is fitted into.
pub fn channel_ceiling(white_levels: &[u16], channel: usize, limit_to_white_level: bool) -> f32 {
    if !limit_to_white_level || white_levels.is_empty() {
        u16::MAX as f32
    } else {
        level_for(white_levels, channel) as f32
    }
}

/// Adds the black level back and brings every sample into the valid sensor
/// range, either by clipping each channel or by scaling all channels with a
/// single multiplier so their ratios survive.
pub fn fit<E: ChannelExecutor>(
    channels: ChannelSet<f32>,
    black_levels: &[u16],
    white_levels: &[u16],
    limit_to_white_level: bool,
    scale_instead_of_clip: bool,
    executor: &E,
) -> ChannelSet<u16> {
    let channels = add_black(channels, black_levels);
    let count = channels.len();
    let ceilings: Vec<f32> = (0..count)
        .map(|i| channel_ceiling(white_levels, i, limit_to_white_level))
        .collect();

    let multiplier = if scale_instead_of_clip {
        let maximums = executor.map_channels(count, |i| plane_max(channels.plane(i)));
        let common_maximum = maximums.into_iter().fold(0.0f32, f32::max);
        let ceiling = ceilings.iter().copied().fold(f32::INFINITY, f32::min);
        if common_maximum > ceiling {
            let multiplier = ceiling / common_maximum;
            debug!(common_maximum, ceiling, multiplier, "Scaling channels into range");
            Some(multiplier)
        } else {
            None
        }
    } else {
        None
    };

    let planes = executor.map_channels(count, |i| {
        let ceiling = ceilings[i];
        let plane = channels.plane(i);
        match multiplier {
            Some(m) => plane.iter().map(|&v| (v * m).clamp(0.0, ceiling) as u16).collect(),
            None => plane.iter().map(|&v| v.clamp(0.0, ceiling) as u16).collect(),
        }
    });
    channels.with_planes(planes)
}

/// Keeps the top `bits` bits of every sample, or with `leave_lsb` the bottom
/// `bits` bits shifted up to the most significant end.
pub fn bitwise_mask(plane: &[u16], bits: i32, leave_lsb: bool) -> Vec<u16> {
    let bits = bits.clamp(0, 16) as u32;
    if leave_lsb {
        let mask = ((1u32 << bits) - 1) as u16;
        let shift = 16 - bits;
        plane
            .iter()
            .map(|&v| (((v & mask) as u32) << shift) as u16)
            .collect()
    } else {
        let mask = (0xffffu32 << (16 - bits)) as u16;
        plane.iter().map(|&v| v & mask).collect()
    }
}

/// Applies [`bitwise_mask`] to the black-subtracted active area of an image.
pub fn mask_image<E: ChannelExecutor>(
    image: &PixelBuffer,
    bits: i32,
    leave_lsb: bool,
    executor: &E,
) -> PixelBuffer {
    let channels = codec::split(image);
    let planes = executor.map_channels(channels.len(), |i| {
        bitwise_mask(channels.plane(i), bits, leave_lsb)
    });
    let masked = add_black_u16(channels.with_planes(planes), &image.geometry.black_levels);
    codec::reassemble(&masked, image)
}
