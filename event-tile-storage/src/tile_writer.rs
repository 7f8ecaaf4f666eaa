/// Packs a polarity event stream into MONO8 block files.
use crate::block::{BlockBuffer, BlockKey, write_block_file};
use crate::error::{Result, StorageError};
use crate::events::{Event, EventReader};
use crate::format::{BlockFormat, Mono8};
use crate::manifest::VolumeManifest;
use crate::progress::progress_bar;
use crate::volume::{DataFormat, Dim3};
use constants::sensor::SENSOR_RESOLUTION;
use constants::storage::{DEFAULT_TILE_COUNT_Z, DEFAULT_TILE_SIZE};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Geometry of the packed volume.
#[derive(Debug, Clone, Copy)]
pub struct PackOptions {
    pub tile_size: Dim3,
    /// Blocks along the time axis; x and y counts follow from the sensor.
    pub tile_count_z: usize,
    /// Sensor resolution as (height, width).
    pub sensor: (usize, usize),
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            tile_size: Dim3::splat(DEFAULT_TILE_SIZE),
            tile_count_z: DEFAULT_TILE_COUNT_Z,
            sensor: SENSOR_RESOLUTION,
        }
    }
}

impl PackOptions {
    /// Tile grid covering the sensor, rounded up on x and y.
    pub fn tile_count(&self) -> Dim3 {
        let (height, width) = self.sensor;
        Dim3::new(
            width.div_ceil(self.tile_size.x),
            height.div_ceil(self.tile_size.y),
            self.tile_count_z,
        )
    }

    /// Number of addressable time steps.
    pub fn time_length(&self) -> usize {
        self.tile_size.z * self.tile_count_z
    }
}

/// Counters reported after packing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub events_read: usize,
    pub events_placed: usize,
    /// Events whose time index fell outside the volume.
    pub skipped_time: usize,
    /// Events outside the sensor area.
    pub skipped_bounds: usize,
    pub blocks_written: usize,
}

/// Accumulates events into sparse in-memory blocks, then writes them out.
/// Blocks that never receive an event are not written.
pub struct TileWriter {
    output_dir: PathBuf,
    options: PackOptions,
    blocks: HashMap<BlockKey, BlockBuffer<i8>>,
    summary: PackSummary,
}

impl TileWriter {
    pub fn new(output_dir: &Path, options: PackOptions) -> Result<Self> {
        if options.tile_size.checked_volume().is_none_or(|voxels| voxels == 0)
            || options.tile_count_z == 0
        {
            return Err(StorageError::InvalidConfig(
                "tile size and time tile count must be non-zero".to_string(),
            ));
        }
        if options.tile_size.z.checked_mul(options.tile_count_z).is_none() {
            return Err(StorageError::InvalidConfig(format!(
                "time length {} * {} overflows",
                options.tile_size.z, options.tile_count_z
            )));
        }
        fs::create_dir_all(output_dir).map_err(|err| StorageError::io(output_dir, err))?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            options,
            blocks: HashMap::new(),
            summary: PackSummary::default(),
        })
    }

    /// Place one event, later events on the same voxel overwrite earlier ones.
    /// Returns whether the event landed inside the volume.
    pub fn add_event(&mut self, event: &Event) -> bool {
        self.summary.events_read += 1;

        let t = event.time_index();
        if t < 0 || t as u64 >= self.options.time_length() as u64 {
            self.summary.skipped_time += 1;
            return false;
        }

        let (height, width) = self.options.sensor;
        if event.x < 0 || event.y < 0 || event.x as u64 >= width as u64 || event.y as u64 >= height as u64 {
            self.summary.skipped_bounds += 1;
            return false;
        }

        let size = self.options.tile_size;
        let (x, y, t) = (event.x as usize, event.y as usize, t as usize);
        let key = BlockKey::new(x / size.x, y / size.y, t / size.z);

        let block = self.blocks.entry(key).or_insert_with(|| Mono8::zero(size));
        block.voxel_mut(x % size.x, y % size.y, t % size.z)[0] = event.polarity;

        self.summary.events_placed += 1;
        true
    }

    /// Feed every event of a text event file.
    pub fn add_event_file(&mut self, path: &Path) -> Result<()> {
        info!("Reading events from {}", path.display());
        for event in EventReader::open(path)? {
            self.add_event(&event?);
        }
        Ok(())
    }

    /// Write all touched blocks in parallel plus the volume manifest.
    pub fn finish(self) -> Result<PackSummary> {
        let TileWriter {
            output_dir,
            options,
            blocks,
            mut summary,
        } = self;

        let tile_count = options.tile_count();
        info!(
            "Tiles number: {} x {} x {}, {} non-empty",
            tile_count.x,
            tile_count.y,
            tile_count.z,
            blocks.len()
        );

        let mut blocks: Vec<(BlockKey, BlockBuffer<i8>)> = blocks.into_iter().collect();
        blocks.sort_by_key(|(key, _)| (key.bz, key.by, key.bx));

        let pb = progress_bar(blocks.len() as u64, "blocks", "Writing blocks");
        blocks.par_iter().try_for_each(|(key, block)| {
            write_block_file(&key.path_in(&output_dir), Mono8::encode(block))?;
            pb.inc(1);
            Ok::<(), StorageError>(())
        })?;
        pb.finish_with_message("Blocks written");

        summary.blocks_written = blocks.len();

        let mut manifest = VolumeManifest::new(options.tile_size, tile_count, DataFormat::Mono8, options.sensor);
        manifest.blocks_written = summary.blocks_written;
        let manifest_path = manifest.write(&output_dir)?;
        info!("Saved {}", manifest_path.display());

        if summary.skipped_time > 0 || summary.skipped_bounds > 0 {
            warn!(
                skipped_time = summary.skipped_time,
                skipped_bounds = summary.skipped_bounds,
                "events outside the volume were dropped"
            );
        }

        Ok(summary)
    }
}

/// Pack an event file into `output_dir`.
pub fn pack_events(events_path: &Path, output_dir: &Path, options: PackOptions) -> Result<PackSummary> {
    let mut writer = TileWriter::new(output_dir, options)?;
    writer.add_event_file(events_path)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: f64, x: i64, y: i64, polarity: i8) -> Event {
        Event {
            timestamp,
            x,
            y,
            polarity,
        }
    }

    fn small_options() -> PackOptions {
        PackOptions {
            tile_size: Dim3::splat(4),
            tile_count_z: 2,
            sensor: (6, 10),
        }
    }

    #[test]
    fn tile_count_rounds_sensor_up() {
        assert_eq!(small_options().tile_count(), Dim3::new(3, 2, 2));
        assert_eq!(PackOptions::default().tile_count(), Dim3::new(20, 12, 46));
    }

    #[test]
    fn drops_events_outside_volume() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TileWriter::new(dir.path(), small_options()).unwrap();

        assert!(writer.add_event(&event(0.001, 1, 1, 1)));
        assert!(!writer.add_event(&event(0.008, 1, 1, 1)));
        assert!(!writer.add_event(&event(-0.001, 1, 1, 1)));
        assert!(!writer.add_event(&event(0.001, 10, 1, 1)));
        assert!(!writer.add_event(&event(0.001, 1, -1, 1)));

        let summary = writer.finish().unwrap();
        assert_eq!(summary.events_read, 5);
        assert_eq!(summary.events_placed, 1);
        assert_eq!(summary.skipped_time, 2);
        assert_eq!(summary.skipped_bounds, 2);
        assert_eq!(summary.blocks_written, 1);
    }

    #[test]
    fn rejects_overflowing_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let options = PackOptions {
            tile_size: Dim3::new(4, 4, 1 << 40),
            tile_count_z: 1 << 40,
            sensor: (6, 10),
        };
        assert!(matches!(
            TileWriter::new(dir.path(), options),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn writes_only_touched_blocks_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TileWriter::new(dir.path(), small_options()).unwrap();
        writer.add_event(&event(0.005, 9, 5, -1));
        let summary = writer.finish().unwrap();

        assert_eq!(summary.blocks_written, 1);
        let path = BlockKey::new(2, 1, 1).path_in(dir.path());
        let bytes = fs::read(path).unwrap();
        assert_eq!(bytes.len(), 64);

        let block = Mono8::decode(&bytes, Dim3::splat(4)).unwrap();
        assert_eq!(block.voxel(1, 1, 1), &[-1]);

        let manifest = VolumeManifest::load(dir.path()).unwrap();
        assert_eq!(manifest.tile_count, Dim3::new(3, 2, 2));
        assert_eq!(manifest.blocks_written, 1);
    }
}
