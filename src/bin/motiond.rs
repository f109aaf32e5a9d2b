//! motiond - temporal motion detector daemon
//!
//! This daemon:
//! 1. Loads the detector config (defaults, file, environment, flags)
//! 2. Opens the frame source (camera, video file, image directory, stub://)
//! 3. Runs the motion pipeline until the stream ends or Ctrl-C is pressed
//! 4. Logs the total run time

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use temporal_motion::{
    open_source, ConfigOverrides, DetectorConfig, LogSink, MotionPipeline, PacingStrategy,
    QuitSignal,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file, image directory, camera device or stub:// scene.
    #[arg(short = 'v', long)]
    video: Option<String>,
    /// Minimum contour area for a motion region.
    #[arg(short = 'a', long)]
    min_area: Option<u32>,
    /// Target frames per second.
    #[arg(short = 'f', long)]
    frame_rate: Option<f64>,
    /// Dilation iterations applied to the frame delta.
    #[arg(short = 'i', long)]
    iterations: Option<u8>,
    /// NMS overlap threshold.
    #[arg(short = 'o', long)]
    overlap_thresh: Option<f64>,
    /// Motion buffer length in frames.
    #[arg(short = 'm', long)]
    motion: Option<usize>,
    /// JSON or TOML config file.
    #[arg(long, env = "MOTION_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Pacing strategy: spin or sleep.
    #[arg(long)]
    pacing: Option<PacingStrategy>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let overrides = ConfigOverrides {
        source: args.video,
        min_area: args.min_area,
        frame_rate: args.frame_rate,
        dilation_iterations: args.iterations,
        overlap_threshold: args.overlap_thresh,
        motion_window: args.motion,
        pacing: args.pacing,
    };
    let cfg = DetectorConfig::load_with(args.config.as_deref(), overrides)?;
    log::info!(
        "motiond {} source={} min_area={} frame_rate={} dilation={} overlap={} motion_window={}",
        env!("CARGO_PKG_VERSION"),
        cfg.source,
        cfg.min_area,
        cfg.frame_rate,
        cfg.dilation_iterations,
        cfg.overlap_threshold,
        cfg.motion_window
    );

    let quit = QuitSignal::new();
    quit.install_ctrlc()?;

    let mut source = open_source(&cfg.source, cfg.frame_rate.round().max(1.0) as u32)?;
    let mut pipeline = MotionPipeline::new(cfg)?;
    let mut sink = LogSink::new();

    let summary = pipeline.run(&mut source, &mut sink, &quit, args.max_frames)?;
    log::info!(
        "total time: {:.3}s ({} frames, {} with motion, {} over budget)",
        summary.elapsed.as_secs_f64(),
        summary.frames,
        summary.detection_frames,
        summary.overruns
    );
    Ok(())
}
