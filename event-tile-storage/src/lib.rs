//! Tile-based volumetric storage for synthesized event-camera data.
//!
//! A volume is a grid of fixed-size blocks, one raw file each, spanning two
//! sensor axes and time. [`storage::TileStorage`] reads voxels, lines and
//! planes through a bounded LRU block cache; absent block files read as zeros.

pub mod block;
pub mod cache;
pub mod coordinates;
pub mod error;
pub mod events;
pub mod exporter;
pub mod format;
pub mod logging;
pub mod manifest;
pub mod perceptual;
pub mod progress;
pub mod slice;
pub mod storage;
pub mod tile_writer;
pub mod volume;

pub use block::{BlockBuffer, BlockKey};
pub use cache::{BlockCache, CacheStats};
pub use coordinates::{CoordinateMapper, LocalOffset};
pub use error::{Result, StorageError};
pub use format::{BlockFormat, Mono8, Rgba32F};
pub use perceptual::{lin_log, lin_log_value};
pub use slice::{Line, Plane, Slice};
pub use storage::{TileStorage, Volume, VolumeSlice};
pub use volume::{Axis, DataFormat, Dim3, VolumeConfig};
