/// Exports every time step of a volume as an image sequence.
use crate::error::{Result, StorageError};
use crate::perceptual::lin_log;
use crate::progress::progress_bar;
use crate::slice::Plane;
use crate::storage::Volume;
use crate::volume::Axis;
use constants::perceptual::{LIN_LOG_THRESHOLD, LUMA_SCALE};
use constants::sensor::SENSOR_RESOLUTION;
use half::f16;
use image::{GrayImage, Luma, Rgb, RgbImage};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Image container for exported frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Exr,
    Png,
}

impl FrameFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Exr => "exr",
            FrameFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub format: FrameFormat,
    /// Write EXR samples as f16 instead of f32.
    pub half_float: bool,
    pub threshold: f64,
    /// Expected (height, width) of RGBA frames fed to lin-log.
    pub sensor: (usize, usize),
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: FrameFormat::Exr,
            half_float: false,
            threshold: LIN_LOG_THRESHOLD,
            sensor: SENSOR_RESOLUTION,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub frames_written: usize,
    pub frames_failed: usize,
}

/// Frame path for time step `z`, `frame_000042.exr`.
pub fn frame_path(output_dir: &Path, z: usize, format: FrameFormat) -> PathBuf {
    output_dir.join(format!("frame_{:06}.{}", z, format.extension()))
}

/// Export one frame per time step in parallel over a shared store.
/// A failing frame is logged and counted; the remaining frames still export.
pub fn export_frames(volume: &Volume, output_dir: &Path, options: &ExportOptions) -> Result<ExportSummary> {
    fs::create_dir_all(output_dir).map_err(|err| StorageError::io(output_dir, err))?;

    let depth = volume.frame_dim().z;
    info!(
        "Starting conversion of {} timestamps to {} images",
        depth,
        options.format.extension()
    );

    let pb = progress_bar(depth as u64, "timestamps", "Processing");
    let failed = AtomicUsize::new(0);

    (0..depth).into_par_iter().for_each(|z| {
        let path = frame_path(output_dir, z, options.format);
        if let Err(err) = export_frame(volume, z, &path, options) {
            warn!("Error processing timestamp {}: {}", z, err);
            failed.fetch_add(1, Ordering::Relaxed);
        }
        pb.inc(1);
    });
    pb.finish_with_message("Conversion complete");

    let frames_failed = failed.into_inner();
    let summary = ExportSummary {
        frames_written: depth - frames_failed,
        frames_failed,
    };
    info!(
        "Exported {} frames to {} ({} failed)",
        summary.frames_written,
        output_dir.display(),
        summary.frames_failed
    );
    Ok(summary)
}

/// Export time step `z` to `path`.
pub fn export_frame(volume: &Volume, z: usize, path: &Path, options: &ExportOptions) -> Result<()> {
    match volume {
        Volume::Rgba(storage) => {
            let plane = storage.plane(Axis::Z, z as i64)?;
            let luma = lin_log(&plane, options.threshold, options.sensor)?;
            match options.format {
                FrameFormat::Exr => write_grey_exr(path, &luma, options.half_float),
                FrameFormat::Png => write_luma_png(path, &luma),
            }
        }
        Volume::Mono(storage) => {
            let plane = storage.plane(Axis::Z, z as i64)?;
            match options.format {
                FrameFormat::Exr => {
                    let values = Plane {
                        rows: plane.rows,
                        cols: plane.cols,
                        height: plane.height,
                        width: plane.width,
                        channels: 1,
                        data: plane.data.iter().map(|&p| p as f32).collect(),
                    };
                    write_grey_exr(path, &values, options.half_float)
                }
                FrameFormat::Png => write_polarity_png(path, &plane),
            }
        }
    }
}

/// Single-channel plane replicated across RGB.
fn write_grey_exr(path: &Path, plane: &Plane<f32>, half_float: bool) -> Result<()> {
    let value = |x: usize, y: usize| plane.at(y, x)[0];
    if half_float {
        exr::prelude::write_rgb_file(path, plane.width, plane.height, |x, y| {
            let v = f16::from_f32(value(x, y));
            (v, v, v)
        })?;
    } else {
        exr::prelude::write_rgb_file(path, plane.width, plane.height, |x, y| {
            let v = value(x, y);
            (v, v, v)
        })?;
    }
    Ok(())
}

/// Lin-log plane normalised so that full-scale luma maps to white.
fn write_luma_png(path: &Path, plane: &Plane<f32>) -> Result<()> {
    let full_scale = LUMA_SCALE.ln() as f32;
    let image = GrayImage::from_fn(plane.width as u32, plane.height as u32, |x, y| {
        let v = plane.at(y as usize, x as usize)[0] / full_scale;
        Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    });
    image.save(path)?;
    Ok(())
}

/// White background, OFF events red, ON events blue.
fn write_polarity_png(path: &Path, plane: &Plane<i8>) -> Result<()> {
    let image = RgbImage::from_fn(plane.width as u32, plane.height as u32, |x, y| {
        match plane.at(y as usize, x as usize)[0] {
            p if p > 0 => Rgb([0, 0, 255]),
            p if p < 0 => Rgb([255, 0, 0]),
            _ => Rgb([255, 255, 255]),
        }
    });
    image.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_zero_padded() {
        let path = frame_path(Path::new("out"), 42, FrameFormat::Exr);
        assert_eq!(path, Path::new("out").join("frame_000042.exr"));
    }

    #[test]
    fn png_extension() {
        assert_eq!(FrameFormat::Png.extension(), "png");
    }
}
