/// Reconstructed results: single voxels, lines and planes.
use crate::volume::Axis;

/// Samples along one free axis, `len` voxels of `channels` values each.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<T> {
    pub axis: Axis,
    pub channels: usize,
    pub data: Vec<T>,
}

impl<T: Copy> Line<T> {
    pub fn len(&self) -> usize {
        self.data.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Channel values at position `i` along the line.
    pub fn at(&self, i: usize) -> &[T] {
        &self.data[i * self.channels..(i + 1) * self.channels]
    }
}

/// Row-major plane of shape (height, width, channels).
///
/// `rows` and `cols` name the volume axes the plane spans: binding x gives
/// (z, y), binding y gives (z, x), binding z gives (y, x).
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    pub rows: Axis,
    pub cols: Axis,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<T>,
}

impl<T: Copy + Default> Plane<T> {
    /// Zero-initialised plane.
    pub fn zeros(rows: Axis, cols: Axis, height: usize, width: usize, channels: usize) -> Self {
        Self {
            rows,
            cols,
            height,
            width,
            channels,
            data: vec![T::default(); height * width * channels],
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    pub fn at(&self, row: usize, col: usize) -> &[T] {
        let start = (row * self.width + col) * self.channels;
        &self.data[start..start + self.channels]
    }

    pub(crate) fn at_mut(&mut self, row: usize, col: usize) -> &mut [T] {
        let start = (row * self.width + col) * self.channels;
        &mut self.data[start..start + self.channels]
    }

    /// Keep the top-left `height` x `width` region, clipped to the plane.
    pub fn crop(self, height: usize, width: usize) -> Self {
        let height = height.min(self.height);
        let width = width.min(self.width);
        if height == self.height && width == self.width {
            return self;
        }

        let row_len = width * self.channels;
        let mut data = Vec::with_capacity(height * row_len);
        for row in 0..height {
            let start = row * self.width * self.channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        Self {
            height,
            width,
            data,
            ..self
        }
    }
}

/// Result of a `get` query, shaped by the number of bound axes.
#[derive(Debug, Clone, PartialEq)]
pub enum Slice<T> {
    /// All three axes bound: one voxel's channel values.
    Voxel(Vec<T>),
    /// Two axes bound.
    Line(Line<T>),
    /// One axis bound.
    Plane(Plane<T>),
}

impl<T> Slice<T> {
    pub fn into_voxel(self) -> Option<Vec<T>> {
        match self {
            Slice::Voxel(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_line(self) -> Option<Line<T>> {
        match self {
            Slice::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn into_plane(self) -> Option<Plane<T>> {
        match self {
            Slice::Plane(plane) => Some(plane),
            _ => None,
        }
    }

    /// Every sample of the slice, flattened.
    pub fn samples(&self) -> &[T] {
        match self {
            Slice::Voxel(v) => v,
            Slice::Line(line) => &line.data,
            Slice::Plane(plane) => &plane.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_keeps_top_left_region() {
        let mut plane = Plane::<u8>::zeros(Axis::Y, Axis::X, 3, 4, 1);
        for row in 0..3 {
            for col in 0..4 {
                plane.at_mut(row, col)[0] = (row * 10 + col) as u8;
            }
        }

        let cropped = plane.crop(2, 3);
        assert_eq!(cropped.shape(), (2, 3, 1));
        assert_eq!(cropped.data, vec![0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn crop_larger_than_plane_is_a_no_op() {
        let plane = Plane::<f32>::zeros(Axis::Y, Axis::X, 4, 4, 4);
        assert_eq!(plane.crop(720, 1280).shape(), (4, 4, 4));
    }
}
