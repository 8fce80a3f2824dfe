//! MJPEG Player
//!
//! Headless runner: plays a local file or HTTP stream into an in-memory
//! display and optionally saves snapshots as PNG.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use mjpeg_player::config::DEFAULT_UPDATE_INTERVAL;
use mjpeg_player::display::SnapshotSink;
use mjpeg_player::{
    DisplayGeometry, DisplayHandle, PipelineTuning, PixelFormat, PlaybackController,
};

/// MJPEG Player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["path", "url"])))]
struct Args {
    /// Local MJPEG file
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// HTTP MJPEG stream URL
    #[arg(short, long)]
    url: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_UPDATE_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    /// Display width
    #[arg(long, default_value_t = 240)]
    width: u32,

    /// Display height
    #[arg(long, default_value_t = 320)]
    height: u32,

    /// Display pixel format (rgb565, rgb888)
    #[arg(long, default_value = "rgb565")]
    format: String,

    /// Path to a pipeline tuning JSON file
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Save presented frames as PNG into this directory
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Save every N-th presented frame
    #[arg(long, default_value_t = 30)]
    snapshot_every: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("MJPEG player starting...");

    let format = PixelFormat::from_name(&args.format)
        .with_context(|| format!("Unknown pixel format: {}", args.format))?;
    let geometry = DisplayGeometry::new(args.width, args.height, format);

    let tuning = match &args.tuning {
        Some(path) => {
            info!("Loading tuning from: {:?}", path);
            PipelineTuning::load_from_file(path)?
        }
        None => PipelineTuning::default(),
    };

    let sink = match &args.snapshot_dir {
        Some(dir) => SnapshotSink::with_snapshots(geometry, dir, args.snapshot_every)
            .context("Failed to prepare snapshot directory")?,
        None => SnapshotSink::new(geometry),
    };
    let display = DisplayHandle::new("snapshot", sink);

    let mut controller = PlaybackController::new();
    controller.set_tuning(tuning)?;
    controller.bind_display(display)?;
    if let Some(path) = args.path {
        controller.set_video_path(path)?;
    }
    if let Some(url) = args.url {
        controller.set_http_url(url)?;
    }
    controller.set_update_interval(Duration::from_millis(args.interval_ms))?;

    let stop = controller.stop_token();
    ctrlc::set_handler(move || stop.request_stop()).context("Failed to install Ctrl-C handler")?;

    controller.start().context("Failed to start playback")?;
    controller.dump_config();

    let result = controller.run(args.ticks);
    let stats = controller.stats();
    info!("Playback statistics:\n{}", serde_json::to_string_pretty(&stats)?);

    if let Err(e) = &result {
        error!("Playback ended: {}", e);
    }
    result.context("Playback failed")?;
    Ok(())
}
