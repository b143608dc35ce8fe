use super::*;
use crate::image_pipeline::flat_field::executor::{PoolExecutor, SequentialExecutor};

const BAYER: [u8; 4] = [0, 1, 1, 2];

fn set(planes: Vec<Vec<f32>>) -> ChannelSet<f32> {
    let len = planes[0].len();
    ChannelSet::new(planes, 1, len)
}

fn bits(set: &ChannelSet<f32>) -> Vec<Vec<u32>> {
    set.planes()
        .iter()
        .map(|plane| plane.iter().map(|v| v.to_bits()).collect())
        .collect()
}

#[test]
fn test_divide_zero_intensity_is_identity() {
    let channel = vec![1.5, 2.0, 3.0];
    assert_eq!(divide_channel(channel.clone(), &[0.0, 0.5, 2.0], 0.0), channel);
}

#[test]
fn test_divide_full_intensity() {
    let result = divide_channel(vec![10.0, 10.0, 10.0], &[0.5, 1.0, 0.0], 1.0);
    assert_eq!(result, vec![20.0, 10.0, 0.0]);
}

#[test]
fn test_divide_partial_intensity() {
    let result = divide_channel(vec![10.0, 10.0], &[0.5, 0.0], 0.5);
    // denominator 1 - (1 - 0.25)
    assert_eq!(result, vec![40.0, 0.0]);
    assert!(result.iter().all(|v| v.is_finite()));
}

#[test]
fn test_luma_map_averages_both_greens() {
    let reference = set(vec![vec![9.0, 9.0], vec![0.4, 0.8], vec![0.6, 1.0], vec![9.0, 9.0]]);
    let luma = luma_shading_map(&reference, &BAYER);
    assert!((luma[0] - 0.5 / 0.9).abs() < 1e-6);
    assert_eq!(luma[1], 1.0);
}

#[test]
fn test_uniform_reference_leaves_image_unchanged() {
    let image = set(vec![vec![100.0, 7.0]; 4]);
    let reference = set(vec![vec![1.0, 1.0]; 4]);
    let (corrected, reference) = correct_luminance(image.clone(), reference, &BAYER, 1.0, &SequentialExecutor);
    let corrected = correct_color(corrected, &reference, &BAYER, 1.0, &SequentialExecutor);
    assert_eq!(corrected, image);
}

#[test]
fn test_zero_luminance_intensity_still_normalizes_reference() {
    let image = set(vec![vec![100.0, 100.0]; 4]);
    let reference = set(vec![
        vec![0.25, 0.5],
        vec![0.5, 1.0],
        vec![0.5, 1.0],
        vec![0.5, 0.5],
    ]);
    let (corrected, reference) =
        correct_luminance(image.clone(), reference, &BAYER, 0.0, &SequentialExecutor);

    // image untouched bit for bit
    assert_eq!(bits(&corrected), bits(&image));
    // non-green reference channels divided by the green map regardless
    assert_eq!(reference.plane(0), &[0.5, 0.5]);
    assert_eq!(reference.plane(3), &[1.0, 0.5]);
    // green reference channels keep their values
    assert_eq!(reference.plane(1), &[0.5, 1.0]);
}

#[test]
fn test_luminance_then_color_flattens_vignetted_image() {
    // red falls off faster than green towards the second sample
    let reference = set(vec![
        vec![1.0, 0.4],
        vec![1.0, 0.5],
        vec![1.0, 0.5],
        vec![1.0, 0.5],
    ]);
    let image = set(vec![vec![200.0, 80.0], vec![300.0, 150.0], vec![300.0, 150.0], vec![100.0, 50.0]]);
    let (image, reference) = correct_luminance(image, reference, &BAYER, 1.0, &SequentialExecutor);
    assert_eq!(image.plane(1), &[300.0, 300.0]);
    assert_eq!(image.plane(0), &[200.0, 160.0]);

    let image = correct_color(image, &reference, &BAYER, 1.0, &SequentialExecutor);
    assert!(image.plane(0).iter().all(|&v| (v - 200.0).abs() < 1e-3));
    assert_eq!(image.plane(3), &[100.0, 100.0]);
}

#[test]
fn test_zero_reference_gives_zero_not_nan() {
    let image = set(vec![vec![100.0, 100.0]; 4]);
    let reference = set(vec![vec![0.0, 1.0]; 4]);
    let (image, reference) = correct_luminance(image, reference, &BAYER, 1.0, &SequentialExecutor);
    let image = correct_color(image, &reference, &BAYER, 1.0, &SequentialExecutor);
    for plane in image.planes() {
        assert_eq!(plane[0], 0.0);
        assert!(plane.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_color_stage_skips_green_channels() {
    let image = set(vec![vec![10.0]; 3]);
    let reference = set(vec![vec![0.5], vec![0.25], vec![0.5]]);
    let corrected = correct_color(image, &reference, &[0, 1, 2], 1.0, &SequentialExecutor);
    assert_eq!(corrected.plane(0), &[20.0]);
    assert_eq!(corrected.plane(1), &[10.0]);
    assert_eq!(corrected.plane(2), &[20.0]);
}

fn correct_both<E: ChannelExecutor>(image: ChannelSet<f32>, reference: ShadingMap, executor: &E) -> ChannelSet<f32> {
    let (image, reference) = correct_luminance(image, reference, &BAYER, 0.7, executor);
    correct_color(image, &reference, &BAYER, 0.3, executor)
}

#[test]
fn test_pool_and_sequential_agree() {
    let planes = |seed: usize| -> Vec<Vec<f32>> {
        (0..4)
            .map(|c| (0..64).map(|i| ((i * 31 + c * 17 + seed) % 97) as f32 / 97.0).collect())
            .collect()
    };
    let image = ChannelSet::new(planes(5), 8, 8);
    let reference = ChannelSet::new(planes(11), 8, 8);

    let sequential = correct_both(image.clone(), reference.clone(), &SequentialExecutor);
    let pooled = correct_both(image, reference, &PoolExecutor::new(Some(4)).unwrap());
    assert_eq!(bits(&sequential), bits(&pooled));
}
