/// Event tile storage command-line entry point
use clap::{Args, Parser, Subcommand, ValueEnum};
use constants::perceptual::LIN_LOG_THRESHOLD;
use constants::sensor::{SENSOR_HEIGHT, SENSOR_WIDTH};
use constants::storage::{DEFAULT_MAX_CACHE_SIZE, DEFAULT_TILE_COUNT_Z, DEFAULT_TILE_SIZE};
use event_tile_storage::exporter::{ExportOptions, FrameFormat, export_frames};
use event_tile_storage::logging::init_logging;
use event_tile_storage::manifest::VolumeManifest;
use event_tile_storage::tile_writer::{PackOptions, pack_events};
use event_tile_storage::{DataFormat, Dim3, Slice, Volume, VolumeConfig, VolumeSlice};
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "event-tiles")]
#[command(about = "Pack, query and export tile-based event camera volumes", long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a text event stream into MONO8 block files
    Pack(PackArgs),
    /// Write one image per time step of a volume
    Export(ExportArgs),
    /// Read a voxel, line or plane and print a summary
    Probe(ProbeArgs),
}

#[derive(Args)]
struct PackArgs {
    /// Event file: 6 header lines, then `timestamp x y polarity` per line
    #[arg(long)]
    events: PathBuf,

    /// Output directory for block files
    #[arg(long)]
    output: PathBuf,

    /// Tile edge length on every axis
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: usize,

    /// Number of tiles along the time axis
    #[arg(long, default_value_t = DEFAULT_TILE_COUNT_Z)]
    tile_count_z: usize,

    /// Sensor width in pixels
    #[arg(long, default_value_t = SENSOR_WIDTH)]
    width: usize,

    /// Sensor height in pixels
    #[arg(long, default_value_t = SENSOR_HEIGHT)]
    height: usize,
}

/// Volume geometry; read from volume.json when present, flags override it.
#[derive(Args)]
struct VolumeArgs {
    /// Directory containing block files
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    tile_size_x: Option<usize>,
    #[arg(long)]
    tile_size_y: Option<usize>,
    #[arg(long)]
    tile_size_z: Option<usize>,
    #[arg(long)]
    tile_count_x: Option<usize>,
    #[arg(long)]
    tile_count_y: Option<usize>,
    #[arg(long)]
    tile_count_z: Option<usize>,

    /// Data format (rgba or int8)
    #[arg(long)]
    data_format: Option<String>,

    /// Maximum number of cached blocks
    #[arg(long, default_value_t = DEFAULT_MAX_CACHE_SIZE)]
    cache_size: usize,

    /// Crop z planes to HEIGHTxWIDTH, e.g. 720x1280
    #[arg(long, value_parser = parse_crop)]
    crop: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageFormat {
    /// OpenEXR, grey replicated across RGB
    Exr,
    /// 8-bit PNG preview
    Png,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    volume: VolumeArgs,

    /// Output directory for frames
    #[arg(long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "exr")]
    format: ImageFormat,

    /// Write EXR samples as 16-bit floats
    #[arg(long)]
    half: bool,

    /// Lin-log threshold applied to RGBA volumes
    #[arg(long, default_value_t = LIN_LOG_THRESHOLD)]
    threshold: f64,

    /// Sensor width expected by lin-log
    #[arg(long, default_value_t = SENSOR_WIDTH)]
    width: usize,

    /// Sensor height expected by lin-log
    #[arg(long, default_value_t = SENSOR_HEIGHT)]
    height: usize,
}

#[derive(Args)]
struct ProbeArgs {
    #[command(flatten)]
    volume: VolumeArgs,

    #[arg(short = 'x', allow_negative_numbers = true)]
    x: Option<i64>,

    #[arg(short = 'y', allow_negative_numbers = true)]
    y: Option<i64>,

    #[arg(short = 'z', allow_negative_numbers = true)]
    z: Option<i64>,
}

fn parse_crop(s: &str) -> Result<(usize, usize), String> {
    let (height, width) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected HEIGHTxWIDTH, got '{}'", s))?;
    let height = height.trim().parse().map_err(|_| format!("bad height '{}'", height))?;
    let width = width.trim().parse().map_err(|_| format!("bad width '{}'", width))?;
    Ok((height, width))
}

impl VolumeArgs {
    /// Manifest geometry (or the pipeline defaults) with command-line overrides.
    fn to_config(&self) -> Result<VolumeConfig, Box<dyn std::error::Error>> {
        let mut config = if VolumeManifest::path_in(&self.input).exists() {
            let manifest = VolumeManifest::load(&self.input)?;
            info!(
                created_by = %manifest.created_by,
                blocks = manifest.blocks_written,
                "Using volume manifest"
            );
            manifest.to_config(&self.input, self.cache_size)
        } else {
            VolumeConfig::new(
                Dim3::splat(DEFAULT_TILE_SIZE),
                Dim3::new(20, 12, DEFAULT_TILE_COUNT_Z),
                &self.input,
                DataFormat::Rgba32F,
            )
            .with_max_cache_size(self.cache_size)
        };

        let overrides = [
            (&mut config.tile_size.x, self.tile_size_x),
            (&mut config.tile_size.y, self.tile_size_y),
            (&mut config.tile_size.z, self.tile_size_z),
            (&mut config.tile_count.x, self.tile_count_x),
            (&mut config.tile_count.y, self.tile_count_y),
            (&mut config.tile_count.z, self.tile_count_z),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(name) = &self.data_format {
            config.data_format = name.parse()?;
        }
        if let Some(crop) = self.crop {
            config.output_crop = Some(crop);
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Pack(args) => run_pack(args),
        Command::Export(args) => run_export(args),
        Command::Probe(args) => run_probe(args),
    }
}

fn run_pack(args: PackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = PackOptions {
        tile_size: Dim3::splat(args.tile_size),
        tile_count_z: args.tile_count_z,
        sensor: (args.height, args.width),
    };

    let summary = pack_events(&args.events, &args.output, options)?;
    info!(
        events = summary.events_read,
        placed = summary.events_placed,
        blocks = summary.blocks_written,
        "Packing complete"
    );
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = args.volume.to_config()?;
    let sensor = (args.height, args.width);

    // RGBA frames must match the sensor before lin-log.
    if config.data_format == DataFormat::Rgba32F && config.output_crop.is_none() {
        config.output_crop = Some(sensor);
    }

    info!("Initializing tile storage: {}", config.directory.display());
    let volume = Volume::open(config)?;

    let options = ExportOptions {
        format: match args.format {
            ImageFormat::Exr => FrameFormat::Exr,
            ImageFormat::Png => FrameFormat::Png,
        },
        half_float: args.half,
        threshold: args.threshold,
        sensor,
    };

    let summary = export_frames(&volume, &args.output, &options)?;
    let stats = volume.cache_stats();
    info!(
        written = summary.frames_written,
        failed = summary.frames_failed,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        "Export complete"
    );
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let volume = Volume::open(args.volume.to_config()?)?;
    println!("Volume {} ({})", volume.frame_dim(), volume.config().data_format);

    match volume.get(args.x, args.y, args.z)? {
        VolumeSlice::Rgba(slice) => print_slice(slice),
        VolumeSlice::Mono(slice) => print_slice(slice),
    }

    let stats = volume.cache_stats();
    println!(
        "Cache: {}/{} blocks, {} hits, {} misses",
        stats.current_size, stats.max_size, stats.hits, stats.misses
    );
    Ok(())
}

fn print_slice<T: Copy + Default + PartialEq + Debug>(slice: Slice<T>) {
    match &slice {
        Slice::Voxel(values) => println!("Voxel: {:?}", values),
        Slice::Line(line) => {
            println!("Line along {}: {} samples x {} channels", line.axis, line.len(), line.channels);
            let samples = slice.samples();
            println!("  First samples: {:?}", &samples[..samples.len().min(8)]);
        }
        Slice::Plane(plane) => {
            println!(
                "Plane ({}, {}): {}x{}x{}",
                plane.rows, plane.cols, plane.height, plane.width, plane.channels
            );
            let non_zero = slice.samples().iter().filter(|&&v| v != T::default()).count();
            println!("  Non-zero samples: {}", non_zero);
        }
    }
}
