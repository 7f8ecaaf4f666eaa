/// Block codec: per-format decoding, encoding and zero blocks.
use crate::block::BlockBuffer;
use crate::volume::{DataFormat, Dim3, TileShape};
use constants::storage::{MONO_CHANNELS, RGBA_CHANNELS};
use std::fmt::Debug;

/// Byte length of a block file disagreeing with the tile shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Voxel format of a volume, chosen once when a store is built.
pub trait BlockFormat: Send + Sync + 'static {
    /// Scalar sample type stored on disk in host byte order.
    type Element: bytemuck::Pod + Default + PartialEq + Debug + Send + Sync;

    const FORMAT: DataFormat;
    const CHANNELS: usize;
    const ELEMENT_SIZE: usize = std::mem::size_of::<Self::Element>();

    fn shape(tile_size: Dim3) -> TileShape {
        TileShape::new(tile_size, Self::CHANNELS)
    }

    /// Expected file length for one block of `tile_size` voxels.
    fn block_bytes(tile_size: Dim3) -> usize {
        Self::shape(tile_size).element_count() * Self::ELEMENT_SIZE
    }

    /// Reinterpret raw file bytes as a block of shape (sz, sy, sx, channels).
    fn decode(
        bytes: &[u8],
        tile_size: Dim3,
    ) -> Result<BlockBuffer<Self::Element>, LengthMismatch> {
        let expected = Self::block_bytes(tile_size);
        if bytes.len() != expected {
            return Err(LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        // Copies into an aligned buffer, file bytes carry no alignment.
        let data: Vec<Self::Element> = bytemuck::pod_collect_to_vec(bytes);
        Ok(BlockBuffer::from_vec(Self::shape(tile_size), data))
    }

    /// Block of the expected shape holding only the zero value.
    fn zero(tile_size: Dim3) -> BlockBuffer<Self::Element> {
        let shape = Self::shape(tile_size);
        BlockBuffer::from_vec(shape, vec![Self::Element::default(); shape.element_count()])
    }

    /// Raw on-disk bytes of a block.
    fn encode(block: &BlockBuffer<Self::Element>) -> &[u8] {
        bytemuck::cast_slice(block.as_slice())
    }
}

/// Four f32 channels per voxel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rgba32F;

impl BlockFormat for Rgba32F {
    type Element = f32;
    const FORMAT: DataFormat = DataFormat::Rgba32F;
    const CHANNELS: usize = RGBA_CHANNELS;
}

/// One i8 channel per voxel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mono8;

impl BlockFormat for Mono8 {
    type Element = i8;
    const FORMAT: DataFormat = DataFormat::Mono8;
    const CHANNELS: usize = MONO_CHANNELS;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_block_bytes_cover_four_floats_per_voxel() {
        assert_eq!(Rgba32F::block_bytes(Dim3::new(2, 2, 2)), 2 * 2 * 2 * 4 * 4);
        assert_eq!(Mono8::block_bytes(Dim3::new(64, 64, 64)), 64 * 64 * 64);
    }

    #[test]
    fn decodes_native_floats_in_voxel_order() {
        let values: Vec<f32> = (0..32).map(|v| v as f32 * 0.5).collect();
        let bytes: &[u8] = bytemuck::cast_slice(&values);

        let block = Rgba32F::decode(bytes, Dim3::new(2, 2, 2)).unwrap();
        assert_eq!(block.voxel(0, 0, 0), &[0.0, 0.5, 1.0, 1.5]);
        assert_eq!(block.voxel(1, 1, 1), &[14.0, 14.5, 15.0, 15.5]);
    }

    #[test]
    fn decodes_signed_bytes() {
        let bytes = [0u8, 1, 0xff, 0, 0, 0, 0, 1];
        let block = Mono8::decode(&bytes, Dim3::new(2, 2, 2)).unwrap();
        assert_eq!(block.voxel(1, 0, 0), &[1]);
        assert_eq!(block.voxel(0, 1, 0), &[-1]);
    }

    #[test]
    fn short_file_is_a_length_mismatch() {
        let bytes = vec![0u8; 31];
        let err = Rgba32F::decode(&bytes, Dim3::new(2, 2, 2)).unwrap_err();
        assert_eq!(
            err,
            LengthMismatch {
                expected: 128,
                actual: 31
            }
        );
    }

    #[test]
    fn zero_block_has_expected_shape() {
        let block = Mono8::zero(Dim3::new(4, 3, 2));
        assert_eq!(block.as_slice().len(), 24);
        assert!(block.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn encode_inverts_decode() {
        let bytes: Vec<u8> = (0..8).collect();
        let block = Mono8::decode(&bytes, Dim3::new(2, 2, 2)).unwrap();
        assert_eq!(Mono8::encode(&block), bytes.as_slice());
    }
}
