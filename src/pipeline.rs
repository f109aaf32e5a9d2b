//! Main loop: acquire, preprocess, buffer, average, extract, suppress, pace, present.
//!
//! `MotionPipeline` owns every piece of per-stream state. Each preprocessed
//! frame enters the motion buffer; the frame the motion buffer evicts moves
//! into the background buffer, and whatever the background buffer evicts is
//! dropped. Detection runs only once both buffers are full, so the first
//! `motion_window + BACKGROUND_WINDOW - 1` frames report warm-up.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::average::weighted_average;
use crate::config::DetectorConfig;
use crate::detect::{non_max_suppression, FrameOutcome, MotionDetection, MotionRegionExtractor};
use crate::error::MotionError;
use crate::frame::{Frame, RawFrame, SlidingFrameBuffer, BACKGROUND_WINDOW};
use crate::imaging::{Preprocessed, Preprocessor};
use crate::ingest::FrameSource;
use crate::pacing::FramePacer;
use crate::sink::{FrameReport, PresentationSink, QuitSignal, SinkControl};
use crate::weights::WeightSchedule;

/// Why a run stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The source has no more frames.
    AcquisitionEnded,
    /// The sink or the quit signal asked to stop.
    QuitRequested,
    /// `max_frames` were processed.
    FrameLimit,
    /// Acquisition failed; the stream is not retried.
    SourceFailed(String),
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub warmup_frames: u64,
    pub detection_frames: u64,
    pub skipped_frames: u64,
    pub total_boxes: u64,
    pub overruns: u64,
    pub elapsed: Duration,
    pub end: StreamEnd,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            frames: 0,
            warmup_frames: 0,
            detection_frames: 0,
            skipped_frames: 0,
            total_boxes: 0,
            overruns: 0,
            elapsed: Duration::ZERO,
            end: StreamEnd::AcquisitionEnded,
        }
    }

    fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::WarmingUp { .. } => self.warmup_frames += 1,
            FrameOutcome::Detected(detection) => {
                if !detection.boxes.is_empty() {
                    self.detection_frames += 1;
                }
                self.total_boxes += detection.boxes.len() as u64;
            }
            FrameOutcome::Skipped { .. } => self.skipped_frames += 1,
        }
    }
}

/// Result of pushing one acquired frame through preprocessing and detection.
pub struct ProcessedFrame {
    pub working: image::RgbImage,
    pub outcome: FrameOutcome,
}

pub struct MotionPipeline {
    config: DetectorConfig,
    preprocessor: Preprocessor,
    motion: SlidingFrameBuffer,
    background: SlidingFrameBuffer,
    motion_weights: WeightSchedule,
    background_weights: WeightSchedule,
    extractor: MotionRegionExtractor,
    pacer: FramePacer,
}

impl MotionPipeline {
    pub fn new(config: DetectorConfig) -> Result<Self, MotionError> {
        config.validate()?;

        let motion = SlidingFrameBuffer::new(config.motion_window)?;
        let background = SlidingFrameBuffer::new(BACKGROUND_WINDOW)?;
        let motion_weights = WeightSchedule::trailing(
            config.motion_window,
            config.weights.start,
            config.weights.end,
        )?;
        let background_weights =
            WeightSchedule::linear(BACKGROUND_WINDOW, config.weights.start, config.weights.end)?;
        let extractor = MotionRegionExtractor::new(
            config.min_area,
            config.dilation_iterations,
            config.delta_threshold,
        );
        let pacer = FramePacer::new(config.frame_rate, config.pacing)?;
        let preprocessor = Preprocessor::new(config.preprocess.clone());

        Ok(Self {
            config,
            preprocessor,
            motion,
            background,
            motion_weights,
            background_weights,
            extractor,
            pacer,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn motion_len(&self) -> usize {
        self.motion.len()
    }

    pub fn background_len(&self) -> usize {
        self.background.len()
    }

    /// Number of frames ingested before the first detection is attempted.
    pub fn warmup_frames(&self) -> usize {
        self.motion.capacity() + self.background.capacity() - 1
    }

    /// Preprocess an acquired frame and ingest it.
    pub fn process(&mut self, raw: &RawFrame) -> ProcessedFrame {
        let Preprocessed { working, frame } = self.preprocessor.process(raw.image());
        let outcome = self.ingest(frame);
        ProcessedFrame { working, outcome }
    }

    /// Buffer a preprocessed frame and, once both windows are full, detect.
    ///
    /// A frame whose size differs from the buffered ones is dropped and
    /// reported as skipped; the buffers are left untouched.
    pub fn ingest(&mut self, frame: Frame) -> FrameOutcome {
        if let Some(expected) = self.motion.front().map(Frame::dimensions) {
            if frame.dimensions() != expected {
                let reason = MotionError::DimensionMismatch {
                    expected,
                    found: frame.dimensions(),
                };
                log::warn!("dropping frame: {}", reason);
                return FrameOutcome::Skipped { reason };
            }
        }

        if let Some(evicted) = self.motion.push_front(frame) {
            // The background buffer's own eviction is dropped here.
            let _ = self.background.push_front(evicted);
        }

        if !self.motion.is_full() || !self.background.is_full() {
            return self.warming_up();
        }

        match self.detect() {
            Ok(detection) => FrameOutcome::Detected(detection),
            Err(MotionError::BufferNotReady { .. }) => self.warming_up(),
            Err(reason) => {
                log::warn!("detection skipped: {}", reason);
                FrameOutcome::Skipped { reason }
            }
        }
    }

    fn warming_up(&self) -> FrameOutcome {
        FrameOutcome::WarmingUp {
            motion_len: self.motion.len(),
            background_len: self.background.len(),
        }
    }

    fn detect(&self) -> Result<MotionDetection, MotionError> {
        let motion_avg = weighted_average(self.motion.snapshot(), &self.motion_weights)?;
        let background_avg =
            weighted_average(self.background.snapshot(), &self.background_weights)?;
        let extraction = self.extractor.extract(&motion_avg, &background_avg)?;
        let boxes = non_max_suppression(&extraction.candidates, self.config.overlap_threshold);
        log::debug!(
            "{} candidate(s), {} after suppression",
            extraction.candidates.len(),
            boxes.len()
        );
        Ok(MotionDetection {
            boxes,
            candidate_count: extraction.candidates.len(),
            mask: extraction.mask,
            delta: extraction.delta,
        })
    }

    /// Drive `source` until it ends, a quit is requested or `max_frames` is reached.
    ///
    /// Every frame is paced, warm-up included. Quit requests are honoured
    /// only between frames.
    pub fn run<S, P>(
        &mut self,
        source: &mut S,
        sink: &mut P,
        quit: &QuitSignal,
        max_frames: Option<u64>,
    ) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        P: PresentationSink + ?Sized,
    {
        let started = Instant::now();
        let mut summary = RunSummary::new();

        source.connect().context("connect frame source")?;
        log::info!(
            "motion pipeline running on {} (motion window {}, background window {}, {} fps)",
            source.stats().location,
            self.motion.capacity(),
            self.background.capacity(),
            self.config.frame_rate
        );

        let end = loop {
            if max_frames.is_some_and(|limit| summary.frames >= limit) {
                break StreamEnd::FrameLimit;
            }

            let loop_start = Instant::now();
            let raw = match source.next_frame() {
                Ok(Some(raw)) => raw,
                Ok(None) => break StreamEnd::AcquisitionEnded,
                Err(err) => {
                    log::warn!("frame acquisition failed: {:#}", err);
                    break StreamEnd::SourceFailed(format!("{:#}", err));
                }
            };

            let ProcessedFrame { working, outcome } = self.process(&raw);
            summary.record(&outcome);

            let pace = self.pacer.pace(loop_start);
            if pace.overrun {
                summary.overruns += 1;
            }

            let control = sink.present(&FrameReport {
                sequence: raw.sequence,
                working: &working,
                outcome: &outcome,
                pace,
            })?;
            if control == SinkControl::Quit || quit.is_requested() {
                break StreamEnd::QuitRequested;
            }
        };

        summary.end = end;
        summary.elapsed = started.elapsed();
        let stats = source.stats();
        log::info!(
            "stream ended ({:?}) after {} frames: {} with motion, {} boxes, {} skipped; source health={} captured={}",
            summary.end,
            summary.frames,
            summary.detection_frames,
            summary.total_boxes,
            summary.skipped_frames,
            source.is_healthy(),
            stats.frames_captured
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DEFAULT_MOTION_WINDOW;

    fn pipeline() -> MotionPipeline {
        MotionPipeline::new(DetectorConfig {
            source: "stub://static".to_string(),
            frame_rate: 1000.0,
            ..DetectorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn warm_up_covers_both_windows() {
        let mut p = pipeline();
        let warmup = DEFAULT_MOTION_WINDOW + BACKGROUND_WINDOW - 1;
        assert_eq!(p.warmup_frames(), warmup);
        for i in 0..warmup {
            let outcome = p.ingest(Frame::filled(64, 48, 50));
            assert!(outcome.is_warming_up(), "frame {} should warm up", i + 1);
        }
        assert_eq!(p.motion_len(), DEFAULT_MOTION_WINDOW);
        assert_eq!(p.background_len(), BACKGROUND_WINDOW - 1);

        let outcome = p.ingest(Frame::filled(64, 48, 50));
        let detection = outcome.detection().expect("first detection");
        assert!(detection.boxes.is_empty());
        assert_eq!(p.background_len(), BACKGROUND_WINDOW);
    }

    #[test]
    fn resized_frames_are_skipped_without_touching_buffers() {
        let mut p = pipeline();
        p.ingest(Frame::filled(64, 48, 50));
        let outcome = p.ingest(Frame::filled(32, 48, 50));
        assert!(matches!(
            outcome,
            FrameOutcome::Skipped {
                reason: MotionError::DimensionMismatch { .. }
            }
        ));
        assert_eq!(p.motion_len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = MotionPipeline::new(DetectorConfig {
            motion_window: 1,
            ..DetectorConfig::default()
        })
        .err()
        .expect("single-frame window");
        assert!(matches!(err, MotionError::InvalidConfiguration(_)));

        let err = MotionPipeline::new(DetectorConfig {
            frame_rate: 1e-300,
            ..DetectorConfig::default()
        })
        .err()
        .expect("frame interval overflows");
        assert!(matches!(err, MotionError::InvalidConfiguration(_)));
    }

    #[test]
    fn two_frame_window_averages_the_newest_frame() {
        let mut p = MotionPipeline::new(DetectorConfig {
            motion_window: 2,
            ..DetectorConfig::default()
        })
        .unwrap();
        assert_eq!(p.warmup_frames(), 31);
        for _ in 0..31 {
            assert!(p.ingest(Frame::filled(32, 24, 70)).is_warming_up());
        }
        let outcome = p.ingest(Frame::filled(32, 24, 70));
        assert!(outcome.detection().is_some());
        assert!(outcome.boxes().is_empty());
    }
}
