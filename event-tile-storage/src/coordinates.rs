/// Global voxel coordinate to block index and local offset mapping.
use crate::block::BlockKey;
use crate::error::{Result, StorageError};
use crate::volume::{Axis, Dim3};

/// Offset of a voxel inside its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalOffset {
    pub lx: usize,
    pub ly: usize,
    pub lz: usize,
}

/// Maps frame coordinates onto the tile grid.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    tile_size: Dim3,
    frame_dim: Dim3,
}

impl CoordinateMapper {
    pub fn new(tile_size: Dim3, tile_count: Dim3) -> Self {
        Self {
            tile_size,
            frame_dim: tile_size.scale(tile_count),
        }
    }

    pub fn frame_dim(&self) -> Dim3 {
        self.frame_dim
    }

    pub fn tile_size(&self) -> Dim3 {
        self.tile_size
    }

    /// Split one axis coordinate into (block index, local offset).
    /// Fails with `OutOfRange` unless `0 <= value < frame_dim[axis]`.
    pub fn map_axis(&self, axis: Axis, value: i64) -> Result<(usize, usize)> {
        let limit = self.frame_dim.get(axis);
        if value < 0 || value as u64 >= limit as u64 {
            return Err(StorageError::OutOfRange { axis, value, limit });
        }

        let value = value as usize;
        let tile = self.tile_size.get(axis);
        Ok((value / tile, value % tile))
    }

    /// Map a full voxel coordinate to its block key and local offset.
    pub fn map(&self, x: i64, y: i64, z: i64) -> Result<(BlockKey, LocalOffset)> {
        let (bx, lx) = self.map_axis(Axis::X, x)?;
        let (by, ly) = self.map_axis(Axis::Y, y)?;
        let (bz, lz) = self.map_axis(Axis::Z, z)?;

        Ok((BlockKey::new(bx, by, bz), LocalOffset { lx, ly, lz }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(Dim3::new(64, 64, 64), Dim3::new(19, 11, 2))
    }

    #[test]
    fn maps_into_block_and_local_offset() {
        let (key, local) = mapper().map(130, 6, 70).unwrap();
        assert_eq!(key, BlockKey::new(2, 0, 1));
        assert_eq!(local, LocalOffset { lx: 2, ly: 6, lz: 6 });
    }

    #[test]
    fn last_voxel_lands_in_last_block() {
        let (key, local) = mapper().map(1215, 703, 127).unwrap();
        assert_eq!(key, BlockKey::new(18, 10, 1));
        assert_eq!(local, LocalOffset { lx: 63, ly: 63, lz: 63 });
    }

    #[test]
    fn negative_coordinate_is_out_of_range() {
        let err = mapper().map(-1, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            StorageError::OutOfRange { axis: Axis::X, value: -1, limit: 1216 }
        ));
    }

    #[test]
    fn frame_dim_coordinate_is_out_of_range() {
        let err = mapper().map_axis(Axis::Y, 704).unwrap_err();
        assert!(matches!(
            err,
            StorageError::OutOfRange { axis: Axis::Y, value: 704, limit: 704 }
        ));
    }
}
