//! Per-channel plane storage shared by every correction stage.

/// Ordered set of equal-length color planes.
///
/// Every plane holds one physical color channel in row-major order over a
/// `plane_height` x `plane_width` grid (the half-resolution grid for Bayer
/// data). Image and reference sets are only combined when their shapes match.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet<T> {
    planes: Vec<Vec<T>>,
    plane_height: usize,
    plane_width: usize,
}

/// Normalized light falloff derived from a reference exposure.
pub type ShadingMap = ChannelSet<f32>;

impl<T> ChannelSet<T> {
    /// Panics when a plane does not match the given shape.
    pub fn new(planes: Vec<Vec<T>>, plane_height: usize, plane_width: usize) -> Self {
        let expected = plane_height * plane_width;
        for (i, plane) in planes.iter().enumerate() {
            assert_eq!(
                plane.len(),
                expected,
                "channel {} has {} samples, expected {}",
                i,
                plane.len(),
                expected
            );
        }
        Self { planes, plane_height, plane_width }
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn plane_height(&self) -> usize {
        self.plane_height
    }

    pub fn plane_width(&self) -> usize {
        self.plane_width
    }

    pub fn plane(&self, index: usize) -> &[T] {
        &self.planes[index]
    }

    pub fn planes(&self) -> &[Vec<T>] {
        &self.planes
    }

    /// Rebuilds a set of the same shape from new planes.
    pub fn with_planes<U>(&self, planes: Vec<Vec<U>>) -> ChannelSet<U> {
        ChannelSet::new(planes, self.plane_height, self.plane_width)
    }

    /// Transforms every plane, keeping the shape.
    pub fn map_planes<U, F>(self, mut f: F) -> ChannelSet<U>
    where
        F: FnMut(usize, Vec<T>) -> Vec<U>,
    {
        let (plane_height, plane_width) = (self.plane_height, self.plane_width);
        let planes = self
            .planes
            .into_iter()
            .enumerate()
            .map(|(i, plane)| f(i, plane))
            .collect();
        ChannelSet::new(planes, plane_height, plane_width)
    }

    /// Panics when the two sets cannot be combined element-wise.
    pub fn assert_same_shape<U>(&self, other: &ChannelSet<U>) {
        assert_eq!(
            (self.len(), self.plane_height, self.plane_width),
            (other.len(), other.plane_height, other.plane_width),
            "channel sets differ in shape"
        );
    }
}

impl ChannelSet<u16> {
    pub fn to_f32(&self) -> ChannelSet<f32> {
        self.with_planes(
            self.planes
                .iter()
                .map(|plane| plane.iter().map(|&v| v as f32).collect())
                .collect(),
        )
    }
}

/// Largest value of a plane, 0 for an empty plane.
pub fn plane_max(plane: &[f32]) -> f32 {
    plane.iter().copied().fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "channel 1 has 3 samples")]
    fn test_unequal_planes_fail_fast() {
        ChannelSet::new(vec![vec![0u16; 4], vec![0u16; 3]], 2, 2);
    }

    #[test]
    fn test_plane_max_of_empty_plane_is_zero() {
        assert_eq!(plane_max(&[]), 0.0);
        assert_eq!(plane_max(&[0.5, 3.0, 1.0]), 3.0);
    }
}
