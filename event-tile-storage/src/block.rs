/// Block keys, decoded block buffers and raw block file access.
use crate::error::{Result, StorageError};
use crate::volume::TileShape;
use constants::storage::{BLOCK_FILE_EXTENSION, BLOCK_FILE_PREFIX};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Grid coordinate of one on-disk block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub bx: usize,
    pub by: usize,
    pub bz: usize,
}

impl BlockKey {
    pub const fn new(bx: usize, by: usize, bz: usize) -> Self {
        Self { bx, by, bz }
    }

    /// File name for this block, `block_<bx>_<by>_<bz>.bin`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            BLOCK_FILE_PREFIX, self.bx, self.by, self.bz, BLOCK_FILE_EXTENSION
        )
    }

    /// Deterministic block path inside a volume directory.
    pub fn path_in(&self, directory: &Path) -> PathBuf {
        directory.join(self.file_name())
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.bx, self.by, self.bz)
    }
}

/// Dense decoded block with logical shape (sz, sy, sx, channels).
#[derive(Debug, Clone, PartialEq)]
pub struct BlockBuffer<T> {
    shape: TileShape,
    data: Vec<T>,
}

impl<T: Copy> BlockBuffer<T> {
    /// Wrap decoded samples; `data.len()` must equal `shape.element_count()`.
    pub(crate) fn from_vec(shape: TileShape, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), shape.element_count());
        Self { shape, data }
    }

    pub fn shape(&self) -> TileShape {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Channel values of the voxel at local offset (lx, ly, lz).
    pub fn voxel(&self, lx: usize, ly: usize, lz: usize) -> &[T] {
        let start = self.shape.voxel_index(lx, ly, lz) * self.shape.channels;
        &self.data[start..start + self.shape.channels]
    }

    pub(crate) fn voxel_mut(&mut self, lx: usize, ly: usize, lz: usize) -> &mut [T] {
        let start = self.shape.voxel_index(lx, ly, lz) * self.shape.channels;
        &mut self.data[start..start + self.shape.channels]
    }
}

/// Read a block file, returning `None` when it does not exist.
pub fn read_block_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::io(path, err)),
    }
}

/// Write raw block bytes, no header.
pub fn write_block_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|err| StorageError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Dim3;

    #[test]
    fn file_name_follows_block_pattern() {
        assert_eq!(BlockKey::new(3, 0, 12).file_name(), "block_3_0_12.bin");
    }

    #[test]
    fn voxel_reads_channels_at_local_offset() {
        let shape = TileShape::new(Dim3::new(2, 2, 2), 2);
        let data: Vec<i32> = (0..16).collect();
        let block = BlockBuffer::from_vec(shape, data);

        assert_eq!(block.voxel(0, 0, 0), &[0, 1]);
        assert_eq!(block.voxel(1, 0, 0), &[2, 3]);
        assert_eq!(block.voxel(0, 1, 0), &[4, 5]);
        assert_eq!(block.voxel(1, 1, 1), &[14, 15]);
    }

    #[test]
    fn missing_block_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = BlockKey::new(0, 0, 0).path_in(dir.path());
        assert!(read_block_file(&path).unwrap().is_none());

        write_block_file(&path, &[1, 2, 3]).unwrap();
        assert_eq!(read_block_file(&path).unwrap(), Some(vec![1, 2, 3]));
    }
}
