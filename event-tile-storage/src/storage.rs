/// Tile-based volumetric store with cache-backed slice reconstruction.
use crate::block::{BlockBuffer, BlockKey, read_block_file};
use crate::cache::{BlockCache, CacheStats};
use crate::coordinates::CoordinateMapper;
use crate::error::{Result, StorageError};
use crate::format::{BlockFormat, Mono8, Rgba32F};
use crate::slice::{Line, Plane, Slice};
use crate::volume::{Axis, DataFormat, Dim3, VolumeConfig};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type SharedBlock<T> = Arc<BlockBuffer<T>>;

/// Position of an axis inside `[x, y, z]` index triples.
fn slot(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
    }
}

/// Read-only chunked volume of format `F`.
///
/// The block cache sits behind one mutex held for the whole
/// lookup, load, insert and evict sequence, so a store can be shared
/// between threads without two misses on one key loading twice.
pub struct TileStorage<F: BlockFormat> {
    config: VolumeConfig,
    mapper: CoordinateMapper,
    cache: Mutex<BlockCache<SharedBlock<F::Element>>>,
    _format: PhantomData<fn() -> F>,
}

impl<F: BlockFormat> TileStorage<F> {
    /// Build a store for `config`; the config's data format must match `F`.
    pub fn new(config: VolumeConfig) -> Result<Self> {
        config.validate()?;
        if config.data_format != F::FORMAT {
            return Err(StorageError::InvalidConfig(format!(
                "volume holds '{}' blocks but the store reads '{}'",
                config.data_format,
                F::FORMAT
            )));
        }

        let mapper = CoordinateMapper::new(config.tile_size, config.tile_count);
        let cache = Mutex::new(BlockCache::new(config.max_cache_size));

        debug!(
            directory = %config.directory.display(),
            tile_size = %config.tile_size,
            tile_count = %config.tile_count,
            format = %F::FORMAT,
            "opened tile storage"
        );

        Ok(Self {
            config,
            mapper,
            cache,
            _format: PhantomData,
        })
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    pub fn frame_dim(&self) -> Dim3 {
        self.mapper.frame_dim()
    }

    pub fn channels(&self) -> usize {
        F::CHANNELS
    }

    /// Dispatch on the bound axes; `None` marks a free axis.
    pub fn get(&self, x: Option<i64>, y: Option<i64>, z: Option<i64>) -> Result<Slice<F::Element>> {
        match (x, y, z) {
            (Some(x), Some(y), Some(z)) => self.voxel(x, y, z).map(Slice::Voxel),
            (Some(x), Some(y), None) => self
                .line(Axis::Z, [(Axis::X, x), (Axis::Y, y)])
                .map(Slice::Line),
            (Some(x), None, Some(z)) => self
                .line(Axis::Y, [(Axis::X, x), (Axis::Z, z)])
                .map(Slice::Line),
            (None, Some(y), Some(z)) => self
                .line(Axis::X, [(Axis::Y, y), (Axis::Z, z)])
                .map(Slice::Line),
            (Some(x), None, None) => self.plane(Axis::X, x).map(Slice::Plane),
            (None, Some(y), None) => self.plane(Axis::Y, y).map(Slice::Plane),
            (None, None, Some(z)) => self.plane(Axis::Z, z).map(Slice::Plane),
            (None, None, None) => Err(StorageError::InvalidQuery),
        }
    }

    /// Channel values of a single voxel.
    pub fn voxel(&self, x: i64, y: i64, z: i64) -> Result<Vec<F::Element>> {
        let (key, local) = self.mapper.map(x, y, z)?;
        let block = self.load_block(key)?;
        Ok(block.voxel(local.lx, local.ly, local.lz).to_vec())
    }

    /// Full-length line along `free`, with the other two axes fixed.
    /// Per-block segments are joined in ascending block order.
    pub fn line(&self, free: Axis, fixed: [(Axis, i64); 2]) -> Result<Line<F::Element>> {
        let mut block_index = [0usize; 3];
        let mut local = [0usize; 3];
        for (axis, value) in fixed {
            if axis == free {
                return Err(StorageError::InvalidQuery);
            }
            let (b, l) = self.mapper.map_axis(axis, value)?;
            block_index[slot(axis)] = b;
            local[slot(axis)] = l;
        }

        let tile = self.config.tile_size.get(free);
        let count = self.config.tile_count.get(free);
        let mut data = Vec::with_capacity(tile * count * F::CHANNELS);

        for b in 0..count {
            block_index[slot(free)] = b;
            let block = self.load_block(key_from(block_index))?;
            for l in 0..tile {
                local[slot(free)] = l;
                data.extend_from_slice(block.voxel(local[0], local[1], local[2]));
            }
        }

        Ok(Line {
            axis: free,
            channels: F::CHANNELS,
            data,
        })
    }

    /// Plane orthogonal to `bound` at coordinate `value`.
    pub fn plane(&self, bound: Axis, value: i64) -> Result<Plane<F::Element>> {
        let (bound_block, bound_local) = self.mapper.map_axis(bound, value)?;
        let (rows, cols) = match bound {
            Axis::X => (Axis::Z, Axis::Y),
            Axis::Y => (Axis::Z, Axis::X),
            Axis::Z => (Axis::Y, Axis::X),
        };

        let frame = self.frame_dim();
        let tile = self.config.tile_size;
        let count = self.config.tile_count;
        let mut plane = Plane::zeros(rows, cols, frame.get(rows), frame.get(cols), F::CHANNELS);

        let mut block_index = [0usize; 3];
        let mut local = [0usize; 3];
        block_index[slot(bound)] = bound_block;
        local[slot(bound)] = bound_local;

        for br in 0..count.get(rows) {
            for bc in 0..count.get(cols) {
                block_index[slot(rows)] = br;
                block_index[slot(cols)] = bc;
                let block = self.load_block(key_from(block_index))?;

                // Clip to the frame in case the grid overshoots it.
                let row_start = br * tile.get(rows);
                let row_end = ((br + 1) * tile.get(rows)).min(frame.get(rows));
                let col_start = bc * tile.get(cols);
                let col_end = ((bc + 1) * tile.get(cols)).min(frame.get(cols));

                for row in row_start..row_end {
                    local[slot(rows)] = row - row_start;
                    for col in col_start..col_end {
                        local[slot(cols)] = col - col_start;
                        plane
                            .at_mut(row, col)
                            .copy_from_slice(block.voxel(local[0], local[1], local[2]));
                    }
                }
            }
        }

        match (bound, self.config.output_crop) {
            (Axis::Z, Some((height, width))) => Ok(plane.crop(height, width)),
            _ => Ok(plane),
        }
    }

    /// Drop every cached block.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    /// Cached block keys from least to most recently used.
    pub fn cached_keys(&self) -> Vec<BlockKey> {
        self.lock_cache().keys_by_recency()
    }

    /// Cache-backed block access: decode on first use, zero block when absent.
    pub fn load_block(&self, key: BlockKey) -> Result<SharedBlock<F::Element>> {
        let directory = self.config.directory.as_path();
        let tile_size = self.config.tile_size;
        self.lock_cache()
            .get_or_load(key, |key| read_block::<F>(directory, key, tile_size).map(Arc::new))
    }

    fn lock_cache(&self) -> MutexGuard<'_, BlockCache<SharedBlock<F::Element>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key_from(index: [usize; 3]) -> BlockKey {
    BlockKey::new(index[0], index[1], index[2])
}

/// Decode one block from disk. Absent files are all-zero blocks.
fn read_block<F: BlockFormat>(
    directory: &Path,
    key: BlockKey,
    tile_size: Dim3,
) -> Result<BlockBuffer<F::Element>> {
    let path = key.path_in(directory);
    match read_block_file(&path)? {
        Some(bytes) => {
            debug!(block = %key, bytes = bytes.len(), "loading block");
            F::decode(&bytes, tile_size).map_err(|mismatch| StorageError::CorruptBlock {
                path,
                expected: mismatch.expected,
                actual: mismatch.actual,
            })
        }
        None => {
            debug!(block = %key, "block file absent, using zero block");
            Ok(F::zero(tile_size))
        }
    }
}

/// Query result of a [`Volume`], tagged with the sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeSlice {
    Rgba(Slice<f32>),
    Mono(Slice<i8>),
}

impl VolumeSlice {
    pub fn data_format(&self) -> DataFormat {
        match self {
            VolumeSlice::Rgba(_) => DataFormat::Rgba32F,
            VolumeSlice::Mono(_) => DataFormat::Mono8,
        }
    }
}

/// Store whose block format is picked at runtime from the config.
pub enum Volume {
    Rgba(TileStorage<Rgba32F>),
    Mono(TileStorage<Mono8>),
}

impl Volume {
    pub fn open(config: VolumeConfig) -> Result<Self> {
        match config.data_format {
            DataFormat::Rgba32F => TileStorage::new(config).map(Volume::Rgba),
            DataFormat::Mono8 => TileStorage::new(config).map(Volume::Mono),
        }
    }

    /// Build from loose construction parameters, `data_format` is "rgba" or "int8".
    pub fn from_parameters(
        tile_size: impl Into<Dim3>,
        tile_count: impl Into<Dim3>,
        directory: &Path,
        max_cache_size: usize,
        data_format: &str,
    ) -> Result<Self> {
        let format: DataFormat = data_format.parse()?;
        let config = VolumeConfig::new(tile_size, tile_count, directory, format)
            .with_max_cache_size(max_cache_size);
        Self::open(config)
    }

    pub fn config(&self) -> &VolumeConfig {
        match self {
            Volume::Rgba(storage) => storage.config(),
            Volume::Mono(storage) => storage.config(),
        }
    }

    pub fn frame_dim(&self) -> Dim3 {
        self.config().frame_dim()
    }

    /// Voxel, line or plane depending on which axes are bound.
    pub fn get(&self, x: Option<i64>, y: Option<i64>, z: Option<i64>) -> Result<VolumeSlice> {
        match self {
            Volume::Rgba(storage) => storage.get(x, y, z).map(VolumeSlice::Rgba),
            Volume::Mono(storage) => storage.get(x, y, z).map(VolumeSlice::Mono),
        }
    }

    pub fn clear_cache(&self) {
        match self {
            Volume::Rgba(storage) => storage.clear_cache(),
            Volume::Mono(storage) => storage.clear_cache(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        match self {
            Volume::Rgba(storage) => storage.cache_stats(),
            Volume::Mono(storage) => storage.cache_stats(),
        }
    }
}
