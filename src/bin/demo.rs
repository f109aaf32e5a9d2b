//! demo - end-to-end synthetic run of the motion detector

use anyhow::{anyhow, Result};
use clap::Parser;

use temporal_motion::{
    DetectorConfig, FrameOutcome, FrameReport, MotionPipeline, QuitSignal, SinkControl,
    StreamEnd, SyntheticConfig, SyntheticScene, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames.
    #[arg(long, default_value_t = 60)]
    frames: u64,
    /// Pacing rate in frames per second.
    #[arg(long, default_value_t = 25.0)]
    fps: f64,
    /// Per-pixel noise amplitude.
    #[arg(long, default_value_t = 0)]
    noise: u8,
    /// Seed for the noise generator.
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let scene = SyntheticConfig {
        location: "stub://square".to_string(),
        scene: SyntheticScene::MovingSquare,
        frames: Some(args.frames),
        noise: args.noise,
        seed: args.seed,
        ..SyntheticConfig::default()
    };
    let config = DetectorConfig {
        source: scene.location.clone(),
        frame_rate: args.fps,
        ..DetectorConfig::default()
    };

    let mut source = SyntheticSource::new(scene);
    let mut pipeline = MotionPipeline::new(config)?;
    let quit = QuitSignal::new();

    let mut sink = print_frame;
    let summary = pipeline.run(&mut source, &mut sink, &quit, None)?;
    if let StreamEnd::SourceFailed(reason) = &summary.end {
        return Err(anyhow!("synthetic source failed: {}", reason));
    }

    println!("Demo complete.");
    println!("Frames: {}", summary.frames);
    println!("Warm-up frames: {}", summary.warmup_frames);
    println!("Frames with motion: {}", summary.detection_frames);
    println!("Boxes reported: {}", summary.total_boxes);
    println!("Total time: {:.3}s", summary.elapsed.as_secs_f64());
    Ok(())
}

fn print_frame(report: &FrameReport<'_>) -> Result<SinkControl> {
    let line = match report.outcome {
        FrameOutcome::WarmingUp {
            motion_len,
            background_len,
        } => format!("warming up ({}/{})", motion_len, background_len),
        FrameOutcome::Detected(detection) => {
            let overlay = report.annotated();
            let outlined = overlay
                .pixels()
                .zip(report.working.pixels())
                .filter(|(drawn, original)| drawn != original)
                .count();
            format!(
                "{} box(es) {:?}, {} px outlined",
                detection.boxes.len(),
                detection.boxes,
                outlined
            )
        }
        FrameOutcome::Skipped { reason } => format!("skipped: {}", reason),
    };
    println!("frame {:>4}: {}", report.sequence, line);
    Ok(SinkControl::Continue)
}
