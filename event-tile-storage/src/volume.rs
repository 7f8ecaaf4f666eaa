/// Volume geometry and construction parameters
use crate::error::{Result, StorageError};
use constants::storage::{DEFAULT_MAX_CACHE_SIZE, MONO_CHANNELS, RGBA_CHANNELS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Volume axis: x is the column, y the row, z the time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Per-axis extent triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dim3 {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dim3 {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Same extent along every axis.
    pub const fn splat(v: usize) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn get(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Elementwise product.
    pub fn scale(&self, other: Dim3) -> Dim3 {
        Dim3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn volume(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Elementwise product, `None` on overflow.
    pub fn checked_scale(&self, other: Dim3) -> Option<Dim3> {
        Some(Dim3::new(
            self.x.checked_mul(other.x)?,
            self.y.checked_mul(other.y)?,
            self.z.checked_mul(other.z)?,
        ))
    }

    /// Product of all three extents, `None` on overflow.
    pub fn checked_volume(&self) -> Option<usize> {
        self.x.checked_mul(self.y)?.checked_mul(self.z)
    }
}

impl From<(usize, usize, usize)> for Dim3 {
    fn from((x, y, z): (usize, usize, usize)) -> Self {
        Dim3::new(x, y, z)
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// On-disk voxel format of every block in a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    /// Four 32-bit float channels (RGBA radiance).
    #[serde(rename = "rgba")]
    Rgba32F,
    /// One signed 8-bit channel (event polarity).
    #[serde(rename = "int8")]
    Mono8,
}

impl DataFormat {
    pub fn channels(&self) -> usize {
        match self {
            DataFormat::Rgba32F => RGBA_CHANNELS,
            DataFormat::Mono8 => MONO_CHANNELS,
        }
    }

    /// Bytes per channel value on disk.
    pub fn element_size(&self) -> usize {
        match self {
            DataFormat::Rgba32F => std::mem::size_of::<f32>(),
            DataFormat::Mono8 => std::mem::size_of::<i8>(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataFormat::Rgba32F => "rgba",
            DataFormat::Mono8 => "int8",
        }
    }
}

impl FromStr for DataFormat {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgba" => Ok(DataFormat::Rgba32F),
            "int8" => Ok(DataFormat::Mono8),
            _ => Err(StorageError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical shape of one decoded block: (sz, sy, sx, channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
    pub size: Dim3,
    pub channels: usize,
}

impl TileShape {
    pub fn new(size: Dim3, channels: usize) -> Self {
        Self { size, channels }
    }

    pub fn voxel_count(&self) -> usize {
        self.size.volume()
    }

    pub fn element_count(&self) -> usize {
        self.voxel_count() * self.channels
    }

    /// Voxel index of local offset (lx, ly, lz) in time-major, row, column order.
    pub fn voxel_index(&self, lx: usize, ly: usize, lz: usize) -> usize {
        (lz * self.size.y + ly) * self.size.x + lx
    }
}

/// Construction parameters for a tile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Voxels per block along x, y, z.
    pub tile_size: Dim3,
    /// Blocks along x, y, z.
    pub tile_count: Dim3,
    /// Directory holding the `block_*.bin` files.
    pub directory: PathBuf,
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
    pub data_format: DataFormat,
    /// Optional (height, width) crop applied to z-bound planes.
    #[serde(default)]
    pub output_crop: Option<(usize, usize)>,
}

fn default_max_cache_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

impl VolumeConfig {
    /// Create config with the default cache size and no output crop.
    pub fn new(
        tile_size: impl Into<Dim3>,
        tile_count: impl Into<Dim3>,
        directory: impl Into<PathBuf>,
        data_format: DataFormat,
    ) -> Self {
        Self {
            tile_size: tile_size.into(),
            tile_count: tile_count.into(),
            directory: directory.into(),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            data_format,
            output_crop: None,
        }
    }

    pub fn with_max_cache_size(mut self, max_cache_size: usize) -> Self {
        self.max_cache_size = max_cache_size;
        self
    }

    pub fn with_output_crop(mut self, height: usize, width: usize) -> Self {
        self.output_crop = Some((height, width));
        self
    }

    /// Full logical volume size, `tile_size * tile_count` per axis.
    pub fn frame_dim(&self) -> Dim3 {
        self.tile_size.scale(self.tile_count)
    }

    pub fn tile_shape(&self) -> TileShape {
        TileShape::new(self.tile_size, self.data_format.channels())
    }

    /// Reject empty tiles, empty tile grids and sizes that overflow.
    pub fn validate(&self) -> Result<()> {
        for axis in Axis::ALL {
            if self.tile_size.get(axis) == 0 {
                return Err(StorageError::InvalidConfig(format!(
                    "tile size along {} must be at least 1",
                    axis
                )));
            }
            if self.tile_count.get(axis) == 0 {
                return Err(StorageError::InvalidConfig(format!(
                    "tile count along {} must be at least 1",
                    axis
                )));
            }
        }
        if self.tile_size.checked_scale(self.tile_count).is_none() {
            return Err(StorageError::InvalidConfig(format!(
                "frame size {} * {} overflows",
                self.tile_size, self.tile_count
            )));
        }
        let block_bytes = self
            .tile_size
            .checked_volume()
            .and_then(|voxels| voxels.checked_mul(self.data_format.channels()))
            .and_then(|elements| elements.checked_mul(self.data_format.element_size()));
        if block_bytes.is_none() {
            return Err(StorageError::InvalidConfig(format!(
                "block of {} voxels overflows",
                self.tile_size
            )));
        }
        if let Some((height, width)) = self.output_crop {
            if height == 0 || width == 0 {
                return Err(StorageError::InvalidConfig(
                    "output crop must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_dim_is_elementwise_product() {
        let config = VolumeConfig::new((64, 64, 32), (20, 12, 46), "/tmp", DataFormat::Mono8);
        assert_eq!(config.frame_dim(), Dim3::new(1280, 768, 1472));
    }

    #[test]
    fn parses_known_formats_case_insensitively() {
        assert_eq!("rgba".parse::<DataFormat>().unwrap(), DataFormat::Rgba32F);
        assert_eq!("INT8".parse::<DataFormat>().unwrap(), DataFormat::Mono8);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "float16".parse::<DataFormat>().unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat(ref s) if s == "float16"));
    }

    #[test]
    fn zero_tile_count_is_invalid() {
        let config = VolumeConfig::new((2, 2, 2), (2, 0, 2), "/tmp", DataFormat::Rgba32F);
        assert!(matches!(
            config.validate(),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn overflowing_frame_is_invalid() {
        let config = VolumeConfig::new(
            Dim3::new(1 << 62, 1, 1),
            Dim3::new(4, 1, 1),
            "/tmp",
            DataFormat::Mono8,
        );
        assert!(matches!(
            config.validate(),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn overflowing_block_size_is_invalid() {
        let config = VolumeConfig::new(
            Dim3::new(1 << 31, 1 << 31, 1),
            Dim3::splat(1),
            "/tmp",
            DataFormat::Rgba32F,
        );
        assert!(matches!(
            config.validate(),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn voxel_index_is_time_major() {
        let shape = TileShape::new(Dim3::new(4, 3, 2), 4);
        assert_eq!(shape.voxel_index(0, 0, 1), 12);
        assert_eq!(shape.voxel_index(1, 2, 0), 9);
        assert_eq!(shape.element_count(), 96);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = VolumeConfig::new((64, 64, 64), (20, 12, 46), "tiles", DataFormat::Rgba32F)
            .with_output_crop(720, 1280);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"rgba\""));
        let back: VolumeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
