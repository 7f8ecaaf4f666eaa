/// Volume manifest stored next to the block files.
use crate::error::{Result, StorageError};
use crate::volume::{DataFormat, Dim3, VolumeConfig};
use constants::storage::MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Geometry and format of a packed volume.
/// Lets readers open a directory without restating its layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeManifest {
    pub tile_size: Dim3,
    pub tile_count: Dim3,
    pub data_format: DataFormat,
    /// Sensor resolution as (height, width).
    pub sensor: (usize, usize),
    /// Blocks actually written; absent blocks read as zeros.
    #[serde(default)]
    pub blocks_written: usize,
    pub created_by: String,
}

impl VolumeManifest {
    pub fn new(tile_size: Dim3, tile_count: Dim3, data_format: DataFormat, sensor: (usize, usize)) -> Self {
        Self {
            tile_size,
            tile_count,
            data_format,
            sensor,
            blocks_written: 0,
            created_by: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn path_in(directory: &Path) -> PathBuf {
        directory.join(MANIFEST_FILE_NAME)
    }

    /// Load `volume.json` from a volume directory.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = Self::path_in(directory);
        let text = fs::read_to_string(&path).map_err(|err| StorageError::io(&path, err))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write pretty JSON `volume.json` into a volume directory.
    pub fn write(&self, directory: &Path) -> Result<PathBuf> {
        let path = Self::path_in(directory);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|err| StorageError::io(&path, err))?;
        Ok(path)
    }

    /// Store configuration for the volume at `directory`.
    /// Time planes are cropped to the sensor, dropping the tile grid's padding.
    pub fn to_config(&self, directory: &Path, max_cache_size: usize) -> VolumeConfig {
        let (height, width) = self.sensor;
        VolumeConfig::new(self.tile_size, self.tile_count, directory, self.data_format)
            .with_max_cache_size(max_cache_size)
            .with_output_crop(height, width)
    }
}
