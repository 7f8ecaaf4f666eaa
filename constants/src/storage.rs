/// Tile-based volume storage defaults

/// Edge length of a cubic tile along every axis
pub const DEFAULT_TILE_SIZE: usize = 64;

/// Number of tiles along the time axis produced by a default render
pub const DEFAULT_TILE_COUNT_Z: usize = 46;

/// Maximum number of decoded blocks kept in memory
pub const DEFAULT_MAX_CACHE_SIZE: usize = 500;

/// Block file name prefix, files are `block_<bx>_<by>_<bz>.bin`
pub const BLOCK_FILE_PREFIX: &str = "block";

/// Block file extension
pub const BLOCK_FILE_EXTENSION: &str = "bin";

/// Volume manifest written alongside the block files
pub const MANIFEST_FILE_NAME: &str = "volume.json";

/// Channels per voxel for RGBA float blocks
pub const RGBA_CHANNELS: usize = 4;

/// Channels per voxel for signed 8-bit event blocks
pub const MONO_CHANNELS: usize = 1;
