//! Luminance and color shading correction.
//!
//! Vignetting is modelled as a luminance falloff shared by all channels plus
//! a residual per-channel color shading. The luminance stage divides every
//! channel by the averaged green shading map; the color stage then divides
//! each non-green channel by its own reference channel, which has itself been
//! stripped of the shared luminance falloff.

use tracing::{debug, warn};

use crate::image_pipeline::flat_field::channels::{ChannelSet, ShadingMap, plane_max};
use crate::image_pipeline::flat_field::executor::ChannelExecutor;
use crate::image_pipeline::raw::types::ROLE_LUMA;

/// Divides `channel` by `reference`, blended by `intensity`.
///
/// Zero intensity leaves the channel alone. Wherever the reference is zero the
/// result is zero, never NaN or infinity.
pub fn divide_channel(channel: Vec<f32>, reference: &[f32], intensity: f32) -> Vec<f32> {
    assert_eq!(channel.len(), reference.len(), "channel and reference differ in length");
    if intensity == 0.0 {
        return channel;
    }
    let mut channel = channel;
    if intensity == 1.0 {
        for (v, &r) in channel.iter_mut().zip(reference) {
            *v = if r != 0.0 { *v / r } else { 0.0 };
        }
    } else {
        for (v, &r) in channel.iter_mut().zip(reference) {
            let denominator = 1.0 - (1.0 - r * intensity);
            *v = if r != 0.0 && denominator != 0.0 { *v / denominator } else { 0.0 };
        }
    }
    channel
}

/// Averages the green reference channels and scales the result to its own maximum.
pub fn luma_shading_map(reference: &ShadingMap, color_pattern: &[u8]) -> Vec<f32> {
    let luma: Vec<usize> = (0..reference.len())
        .filter(|&i| color_pattern[i] == ROLE_LUMA)
        .collect();
    assert!(!luma.is_empty(), "color pattern {:?} has no green channel", color_pattern);

    let mut averaged = reference.plane(luma[0]).to_vec();
    for &i in &luma[1..] {
        for (acc, &v) in averaged.iter_mut().zip(reference.plane(i)) {
            *acc += v;
        }
    }
    if luma.len() > 1 {
        let count = luma.len() as f32;
        averaged.iter_mut().for_each(|v| *v /= count);
    }

    let max = plane_max(&averaged);
    if max > 0.0 {
        averaged.iter_mut().for_each(|v| *v /= max);
    } else {
        warn!("Green reference channels carry no signal");
    }
    averaged
}

/// Corrects the luminance falloff of `image` and removes it from the
/// non-green reference channels.
///
/// Image channels follow `intensity`; the non-green reference channels are
/// always divided at full strength so the color stage sees a reference that
/// is free of the shared falloff regardless of how much of it the image
/// keeps.
pub fn correct_luminance<E: ChannelExecutor>(
    image: ChannelSet<f32>,
    reference: ShadingMap,
    color_pattern: &[u8],
    intensity: f32,
    executor: &E,
) -> (ChannelSet<f32>, ShadingMap) {
    image.assert_same_shape(&reference);
    assert_eq!(color_pattern.len(), image.len(), "color pattern does not match channel count");

    let luma = luma_shading_map(&reference, color_pattern);
    debug!(intensity, "Correcting luminance");

    let image = if intensity != 0.0 {
        let planes = executor.map_channels(image.len(), |i| {
            divide_channel(image.plane(i).to_vec(), &luma, intensity)
        });
        image.with_planes(planes)
    } else {
        image
    };

    let reference = remove_luma_falloff(reference, &luma, color_pattern, executor);
    (image, reference)
}

/// Divides every non-green reference channel by the luma map at full strength.
pub fn remove_luma_falloff<E: ChannelExecutor>(
    reference: ShadingMap,
    luma: &[f32],
    color_pattern: &[u8],
    executor: &E,
) -> ShadingMap {
    let planes = executor.map_channels(reference.len(), |i| {
        let plane = reference.plane(i).to_vec();
        if color_pattern[i] == ROLE_LUMA {
            plane
        } else {
            divide_channel(plane, luma, 1.0)
        }
    });
    reference.with_planes(planes)
}

/// Divides every non-green image channel by its own luminance-corrected
/// reference channel.
pub fn correct_color<E: ChannelExecutor>(
    image: ChannelSet<f32>,
    reference: &ShadingMap,
    color_pattern: &[u8],
    intensity: f32,
    executor: &E,
) -> ChannelSet<f32> {
    if intensity == 0.0 {
        return image;
    }
    image.assert_same_shape(reference);
    debug!(intensity, "Correcting color");

    let planes = executor.map_channels(image.len(), |i| {
        let plane = image.plane(i).to_vec();
        if color_pattern[i] == ROLE_LUMA {
            plane
        } else {
            divide_channel(plane, reference.plane(i), intensity)
        }
    });
    image.with_planes(planes)
}

#[cfg(test)]
mod tests;
