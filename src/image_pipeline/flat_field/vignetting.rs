//! Estimation of the vignetting/shading map from a reference exposure.
//!
//! The reference planes are low-pass filtered with a separable Gaussian so
//! that noise and dust disappear while the large-scale falloff stays, then
//! scaled so that the brightest part of the field maps to 1.0.

use tracing::{debug, warn};

use crate::image_pipeline::flat_field::channels::{ChannelSet, ShadingMap, plane_max};
use crate::image_pipeline::flat_field::executor::ChannelExecutor;
use crate::image_pipeline::flat_field::settings::NormalizationPolicy;

/// Normalized 1D Gaussian kernel of size `round(8 * sigma + 1) | 1`.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "Sigma must be positive");

    let size = ((sigma as f64 * 8.0 + 1.0).round() as usize) | 1;
    let radius = (size / 2) as f64;
    let two_sigma_sq = 2.0 * sigma as f64 * sigma as f64;

    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - radius;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Mirrors an out-of-range index back into `0..len` without repeating the
/// edge sample (`dcb|abcd|cba`).
#[inline]
fn reflect_101(mut index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    loop {
        if index < 0 {
            index = -index;
        } else if index > last {
            index = 2 * last - index;
        } else {
            return index as usize;
        }
    }
}

/// Separable Gaussian blur of a `height` x `width` plane. A non-positive
/// sigma returns the plane unchanged.
pub fn gaussian_blur(plane: &[f32], height: usize, width: usize, sigma: f32) -> Vec<f32> {
    assert_eq!(plane.len(), height * width, "Pixel count mismatch");
    if sigma <= 0.0 || plane.is_empty() {
        return plane.to_vec();
    }

    let kernel = gaussian_kernel_1d(sigma);
    let radius = (kernel.len() / 2) as isize;

    // rows
    let mut temp = vec![0.0f32; plane.len()];
    for (in_row, out_row) in plane.chunks_exact(width).zip(temp.chunks_exact_mut(width)) {
        for (x, out) in out_row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - radius, width);
                acc += weight * in_row[sx];
            }
            *out = acc;
        }
    }

    // columns, accumulated row by row to stay cache friendly
    let mut output = vec![0.0f32; plane.len()];
    for (y, out_row) in output.chunks_exact_mut(width).enumerate() {
        for (k, &weight) in kernel.iter().enumerate() {
            let sy = reflect_101(y as isize + k as isize - radius, height);
            let src_row = &temp[sy * width..(sy + 1) * width];
            for (out, &src) in out_row.iter_mut().zip(src_row) {
                *out += weight * src;
            }
        }
    }
    output
}

/// Rectangular view into a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    top: usize,
    left: usize,
    height: usize,
    width: usize,
}

impl Region {
    fn mean(&self, plane: &[f32], plane_width: usize) -> f64 {
        if self.height == 0 || self.width == 0 {
            return 0.0;
        }
        let mut sum = 0.0f64;
        for y in self.top..self.top + self.height {
            let row = y * plane_width;
            sum += plane[row + self.left..row + self.left + self.width]
                .iter()
                .map(|&v| v as f64)
                .sum::<f64>();
        }
        sum / (self.height * self.width) as f64
    }

    /// Centered square of side `window`, clipped to the region.
    fn center_window(&self, window: usize) -> Region {
        let clip = |start: usize, len: usize| {
            let side = window.min(len);
            let offset = (len / 2).saturating_sub(window / 2).min(len - side);
            (start + offset, side)
        };
        let (top, height) = clip(self.top, self.height);
        let (left, width) = clip(self.left, self.width);
        Region { top, left, height, width }
    }

    /// Splits into two halves along rows (`vertical`) or columns; the first
    /// half gets the extra line of an odd split.
    fn halves(&self, vertical: bool) -> (Region, Region) {
        if vertical {
            let first = self.height.div_ceil(2);
            (
                Region { height: first, ..*self },
                Region { top: self.top + first, height: self.height - first, ..*self },
            )
        } else {
            let first = self.width.div_ceil(2);
            (
                Region { width: first, ..*self },
                Region { left: self.left + first, width: self.width - first, ..*self },
            )
        }
    }
}

/// Narrows the plane down to the brightest region by halving along the
/// longer axis until both sides are below `2 * window`.
fn brightest_region(plane: &[f32], height: usize, width: usize, window: usize) -> Region {
    let limit = window.saturating_mul(2);
    let mut region = Region { top: 0, left: 0, height, width };
    while region.height >= limit || region.width >= limit {
        let vertical = if region.height < limit {
            false
        } else if region.width < limit {
            true
        } else {
            region.height > region.width
        };
        let (first, second) = region.halves(vertical);
        region = if first.mean(plane, width) > second.mean(plane, width) {
            first
        } else {
            second
        };
    }
    region
}

/// Value the plane is divided by under `policy`.
pub fn normalization_divisor(plane: &[f32], height: usize, width: usize, policy: NormalizationPolicy) -> f32 {
    let whole = Region { top: 0, left: 0, height, width };
    match policy {
        NormalizationPolicy::GlobalMax => plane_max(plane),
        NormalizationPolicy::CenterWindow { window } => {
            whole.center_window(window).mean(plane, width) as f32
        }
        NormalizationPolicy::BrightestWindow { window } => brightest_region(plane, height, width, window)
            .center_window(window)
            .mean(plane, width) as f32,
    }
}

/// Scales a blurred plane into a shading map. A reference without signal
/// yields an all-zero map, which the corrector turns into zero output.
pub fn normalize_plane(plane: &[f32], height: usize, width: usize, policy: NormalizationPolicy) -> Vec<f32> {
    let divisor = normalization_divisor(plane, height, width, policy);
    if divisor <= 0.0 || !divisor.is_finite() {
        warn!(divisor, "Reference plane carries no signal, using an all-zero shading map");
        return vec![0.0; plane.len()];
    }
    plane.iter().map(|&v| v / divisor).collect()
}

/// Blurs every reference plane, then normalizes each one. The two passes are
/// separate stages: all planes are blurred before any is normalized.
pub fn estimate<E: ChannelExecutor>(
    reference: &ChannelSet<f32>,
    sigma: f32,
    policy: NormalizationPolicy,
    executor: &E,
) -> ShadingMap {
    let (height, width) = (reference.plane_height(), reference.plane_width());
    debug!(channels = reference.len(), height, width, sigma, "Blurring reference channels");
    let blurred = reference.with_planes(executor.map_channels(reference.len(), |i| {
        gaussian_blur(reference.plane(i), height, width, sigma)
    }));

    debug!(?policy, "Normalizing reference channels");
    let normalized = executor.map_channels(blurred.len(), |i| {
        normalize_plane(blurred.plane(i), height, width, policy)
    });
    blurred.with_planes(normalized)
}
