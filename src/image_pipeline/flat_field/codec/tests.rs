use super::*;
use crate::image_pipeline::raw::types::{ActiveArea, Layout, PixelBuffer, SensorGeometry};

fn ramp(len: usize) -> Vec<u16> {
    (0..len).map(|i| (i as u16).wrapping_mul(37).wrapping_add(11)).collect()
}

fn buffer(layout: Layout, height: usize, width: usize) -> PixelBuffer {
    let geometry = SensorGeometry::new(layout, height, width);
    let data = ramp(geometry.sample_count());
    PixelBuffer::new(data, geometry).unwrap()
}

#[test]
fn test_bayer_split_positions() {
    // 2x4 buffer: row 0 = [a b c d], row 1 = [e f g h]
    let geometry = SensorGeometry::new(Layout::Bayer, 2, 4);
    let image = PixelBuffer::new(vec![1, 2, 3, 4, 5, 6, 7, 8], geometry).unwrap();
    let channels = split(&image);
    assert_eq!(channels.plane(0), &[1, 3]);
    assert_eq!(channels.plane(1), &[2, 4]);
    assert_eq!(channels.plane(2), &[5, 7]);
    assert_eq!(channels.plane(3), &[6, 8]);
    assert_eq!((channels.plane_height(), channels.plane_width()), (1, 2));
}

#[test]
fn test_rgb_split_positions() {
    let geometry = SensorGeometry::new(Layout::LinearRgb, 1, 2);
    let image = PixelBuffer::new(vec![10, 20, 30, 11, 21, 31], geometry).unwrap();
    let channels = split(&image);
    assert_eq!(channels.plane(0), &[10, 11]);
    assert_eq!(channels.plane(1), &[20, 21]);
    assert_eq!(channels.plane(2), &[30, 31]);
}

#[test]
fn test_round_trip_is_identity_for_all_layouts() {
    for (layout, height, width) in [
        (Layout::Bayer, 6, 8),
        (Layout::Bayer, 2, 2),
        (Layout::LinearRgb, 5, 7),
        (Layout::Monochrome, 3, 9),
    ] {
        let image = buffer(layout, height, width);
        let restored = reassemble(&split(&image), &image);
        assert_eq!(restored, image, "{:?} {}x{}", layout, width, height);
    }
}

#[test]
fn test_black_level_clamps_instead_of_wrapping() {
    let geometry = SensorGeometry::new(Layout::Bayer, 2, 2).with_black_levels(vec![10, 20, 30, 40]);
    let image = PixelBuffer::new(vec![5, 25, 30, 100], geometry).unwrap();
    let channels = split(&image);
    assert_eq!(channels.plane(0), &[0]);
    assert_eq!(channels.plane(1), &[5]);
    assert_eq!(channels.plane(2), &[0]);
    assert_eq!(channels.plane(3), &[60]);
}

#[test]
fn test_pixels_outside_active_area_pass_through() {
    let area = ActiveArea::new(1, 2, 5, 6);
    let geometry = SensorGeometry::new(Layout::Bayer, 6, 8).with_active_area(area);
    let image = PixelBuffer::new(ramp(48), geometry).unwrap();

    let channels = split(&image);
    assert_eq!((channels.plane_height(), channels.plane_width()), (2, 2));
    // first sample of channel 0 is pixel (1, 2)
    assert_eq!(channels.plane(0)[0], image.data[8 + 2]);

    let zeroed = channels.with_planes(vec![vec![0u16; 4]; 4]);
    let out = reassemble(&zeroed, &image);
    for y in 0..6 {
        for x in 0..8 {
            let inside = (1..5).contains(&y) && (2..6).contains(&x);
            let expected = if inside { 0 } else { image.data[y * 8 + x] };
            assert_eq!(out.data[y * 8 + x], expected, "pixel ({}, {})", y, x);
        }
    }
}

#[test]
fn test_rgb_active_area_uses_pixel_columns() {
    let area = ActiveArea::new(0, 1, 2, 2);
    let geometry = SensorGeometry::new(Layout::LinearRgb, 2, 3).with_active_area(area);
    let image = PixelBuffer::new(ramp(18), geometry).unwrap();
    let channels = split(&image);
    assert_eq!(channels.plane(0), &[image.data[3], image.data[12]]);
    assert_eq!(channels.plane(2), &[image.data[5], image.data[14]]);
    assert_eq!(reassemble(&channels, &image), image);
}

#[test]
fn test_round_trip_with_black_levels_and_offset_area() {
    use crate::image_pipeline::flat_field::range_ops::add_black_u16;

    for (layout, height, width, area, blacks) in [
        (Layout::Bayer, 7, 9, ActiveArea::new(1, 3, 7, 9), vec![10, 20, 30, 40]),
        (Layout::LinearRgb, 5, 7, ActiveArea::new(1, 2, 4, 6), vec![10, 20, 30]),
        (Layout::Monochrome, 4, 6, ActiveArea::new(1, 1, 3, 5), vec![25]),
    ] {
        let geometry = SensorGeometry::new(layout, height, width)
            .with_active_area(area)
            .with_black_levels(blacks.clone());
        // every sample sits at or above the largest black level
        let data = (0..geometry.sample_count()).map(|i| 100 + (i as u16) * 37).collect();
        let image = PixelBuffer::new(data, geometry).unwrap();

        let channels = split(&image);
        assert!(channels.plane(0).iter().all(|&v| v >= 100 - blacks[0]));
        let restored = reassemble(&add_black_u16(channels, &blacks), &image);
        assert_eq!(restored, image, "{:?} {}x{}", layout, width, height);
    }
}
