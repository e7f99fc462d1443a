//! larreco: event building and straight-track reconstruction from the
//! command line.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand};
use larreco_algorithms::{find_tracks, reconstruct_stream};
use larreco_core::{HitSource, ReconstructionConfig, RowLayout};
use larreco_io::{
    load_points_json, scan_source, DataFileWriter, MappedRowSource, OutputFormat, ResultSink,
};
use log::{info, LevelFilter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    LarrecoIo(#[from] larreco_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] larreco_core::Error),

    #[cfg_attr(feature = "hdf5", allow(dead_code))]
    #[error("unsupported input {0}")]
    UnsupportedInput(String),
}

/// Event building and Hough track finding for pixel detector hits.
#[derive(Parser)]
#[command(name = "larreco")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build events from a hit file and find their tracks
    Process {
        /// Input hit file (row file, or HDF5 with the `hdf5` feature)
        input: PathBuf,

        /// Output file path (.csv or .jsonl)
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cells per row of a row file
        #[arg(long)]
        row_width: Option<usize>,

        /// Maximum time difference between associated hits (ns)
        #[arg(long)]
        dt_cut: Option<u64>,

        /// Minimum hits per event
        #[arg(long)]
        min_event_len: Option<usize>,

        /// Maximum hits per event
        #[arg(long)]
        max_event_len: Option<usize>,

        /// Sorter look-ahead (rows)
        #[arg(long)]
        sort_buffer_length: Option<usize>,

        /// Number of sampled directions
        #[arg(long)]
        num_directions: Option<usize>,

        /// Position bins per projected axis
        #[arg(long)]
        num_positions: Option<usize>,

        /// Minimum inliers for an accepted track
        #[arg(long)]
        track_threshold: Option<usize>,
    },

    /// Show information about a hit file
    Info {
        /// Input hit file
        input: PathBuf,

        /// Cells per row of a row file
        #[arg(long)]
        row_width: Option<usize>,

        /// Sorter look-ahead to check ordering against (rows)
        #[arg(long, default_value = "100")]
        sort_buffer_length: usize,
    },

    /// Run the track finder on a JSON point cloud
    Hough {
        /// JSON array of points or raw rows
        input: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of sampled directions
        #[arg(long)]
        num_directions: Option<usize>,

        /// Position bins per projected axis
        #[arg(long)]
        num_positions: Option<usize>,

        /// Minimum inliers for an accepted track
        #[arg(long)]
        track_threshold: Option<usize>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ReconstructionConfig> {
    match path {
        Some(path) => Ok(ReconstructionConfig::from_file(path)?),
        None => Ok(ReconstructionConfig::default()),
    }
}

fn open_source(path: &Path, row_width: Option<usize>) -> Result<Box<dyn HitSource>> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("h5" | "hdf5") => open_hdf5(path),
        _ => {
            let layout = RowLayout::default();
            let width = row_width.unwrap_or_else(|| layout.width());
            let source = MappedRowSource::open_with_layout(path, width, layout)?;
            Ok(Box::new(source))
        }
    }
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> Result<Box<dyn HitSource>> {
    let source = larreco_io::Hdf5HitSource::open(path)?;
    if let Some(description) = source.description() {
        info!("{}: {}", path.display(), description);
    }
    Ok(Box::new(source))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> Result<Box<dyn HitSource>> {
    Err(CliError::UnsupportedInput(format!(
        "{} (built without the `hdf5` feature)",
        path.display()
    )))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            row_width,
            dt_cut,
            min_event_len,
            max_event_len,
            sort_buffer_length,
            num_directions,
            num_positions,
            track_threshold,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(v) = dt_cut {
                config.events.dt_cut = v;
            }
            if let Some(v) = min_event_len {
                config.events.min_event_len = v;
            }
            if let Some(v) = max_event_len {
                config.events.max_event_len = v;
            }
            if let Some(v) = sort_buffer_length {
                config.events.sort_buffer_length = v;
            }
            if let Some(v) = num_directions {
                config.hough.num_directions = v;
            }
            if let Some(v) = num_positions {
                config.hough.num_positions = v;
            }
            if let Some(v) = track_threshold {
                config.hough.track_threshold = v;
            }
            config.validate()?;

            let format = OutputFormat::from_path(&output)?;
            let source = open_source(&input, row_width)?;
            info!("reading {} rows from {}", source.len(), input.display());

            let start = Instant::now();
            let mut writer = DataFileWriter::create(&output, format)?;
            let summary = reconstruct_stream(source, &config, |reco| writer.write_event(&reco))?;
            writer.flush()?;

            println!(
                "Processed {} events in {:.2}s",
                summary.events,
                start.elapsed().as_secs_f64()
            );
            println!("Hits in events: {}", summary.hits);
            println!("Tracks: {}", summary.tracks);
            println!("Orphan hits: {}", summary.orphans);
            println!("Output: {}", output.display());
        }

        Commands::Info {
            input,
            row_width,
            sort_buffer_length,
        } => {
            let source = open_source(&input, row_width)?;
            let summary = scan_source(&source, sort_buffer_length)?;

            println!("File: {}", input.display());
            println!("Rows: {}", summary.rows);
            if let (Some(first), Some(last)) = (summary.ts_min, summary.ts_max) {
                println!(
                    "Timestamp range: {} - {} ({:.3} ms)",
                    first.as_u64(),
                    last.as_u64(),
                    last.abs_diff(&first) as f64 / 1_000_000.0
                );
            }
            println!("Total charge: {:.3}", summary.charge_sum);
            println!("Out-of-order rows: {}", summary.out_of_order);
            println!("Largest lag: {} rows", summary.max_lag);
            println!(
                "Sorted within {} rows: {}",
                summary.buffer_length,
                if summary.sorted_within_buffer() {
                    "yes"
                } else {
                    "no"
                }
            );
        }

        Commands::Hough {
            input,
            config,
            num_directions,
            num_positions,
            track_threshold,
        } => {
            let config = load_config(config.as_deref())?;
            let mut hough = config.hough;
            if let Some(v) = num_directions {
                hough.num_directions = v;
            }
            if let Some(v) = num_positions {
                hough.num_positions = v;
            }
            if let Some(v) = track_threshold {
                hough.track_threshold = v;
            }

            let points = load_points_json(&input, &config.scale)?;
            let start = Instant::now();
            let tracks = find_tracks(&points, &hough)?;

            println!(
                "Found {} tracks in {} points ({:.2}s)",
                tracks.len(),
                points.len(),
                start.elapsed().as_secs_f64()
            );
            println!(
                "{:<6} | {:>10} | {:>10} | {:>10} | {:>10} | {:>6}",
                "Track", "theta", "phi", "xp", "yp", "hits"
            );
            println!("{:-<67}", "");
            for (index, track) in tracks.iter().enumerate() {
                let [theta, phi, xp, yp] = track.line.params();
                println!(
                    "{:<6} | {:>10.4} | {:>10.4} | {:>10.3} | {:>10.3} | {:>6}",
                    index,
                    theta,
                    phi,
                    xp,
                    yp,
                    track.len()
                );
            }
        }
    }

    Ok(())
}
