//! Presentation side of the loop: per-frame reports, box overlay, quit signal.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detect::{BoundingBox, FrameOutcome};
use crate::pacing::PaceReport;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;

/// Everything the loop knows about one finished frame.
pub struct FrameReport<'a> {
    pub sequence: u64,
    /// Preprocessed color frame; box coordinates refer to it.
    pub working: &'a RgbImage,
    pub outcome: &'a FrameOutcome,
    pub pace: PaceReport,
}

impl FrameReport<'_> {
    pub fn boxes(&self) -> &[BoundingBox] {
        self.outcome.boxes()
    }

    /// The working frame with this frame's kept boxes drawn on it.
    pub fn annotated(&self) -> RgbImage {
        annotate(self.working, self.boxes())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    /// Stop after this frame.
    Quit,
}

pub trait PresentationSink {
    fn present(&mut self, report: &FrameReport<'_>) -> Result<SinkControl>;
}

impl<F> PresentationSink for F
where
    F: FnMut(&FrameReport<'_>) -> Result<SinkControl>,
{
    fn present(&mut self, report: &FrameReport<'_>) -> Result<SinkControl> {
        self(report)
    }
}

/// Writes one log line per frame and never asks to quit.
#[derive(Debug, Default)]
pub struct LogSink {
    presented: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl PresentationSink for LogSink {
    fn present(&mut self, report: &FrameReport<'_>) -> Result<SinkControl> {
        self.presented += 1;
        match report.outcome {
            FrameOutcome::WarmingUp {
                motion_len,
                background_len,
            } => log::debug!(
                "frame {}: warming up (motion {}, background {})",
                report.sequence,
                motion_len,
                background_len
            ),
            FrameOutcome::Detected(detection) if !detection.boxes.is_empty() => log::info!(
                "frame {}: {} motion region(s) from {} candidate(s): {:?}",
                report.sequence,
                detection.boxes.len(),
                detection.candidate_count,
                detection.boxes
            ),
            FrameOutcome::Detected(_) => log::debug!("frame {}: no motion", report.sequence),
            FrameOutcome::Skipped { reason } => {
                log::warn!("frame {}: skipped ({})", report.sequence, reason)
            }
        }
        if report.pace.overrun {
            log::debug!(
                "frame {}: over budget ({:?} busy)",
                report.sequence,
                report.pace.busy
            );
        }
        Ok(SinkControl::Continue)
    }
}

/// Copy of `frame` with every box outlined in green.
pub fn annotate(frame: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut out = frame.clone();
    for b in boxes {
        if b.is_degenerate() {
            continue;
        }
        for inset in 0..BOX_THICKNESS {
            let w = b.width() - 2 * inset;
            let h = b.height() - 2 * inset;
            if w < 1 || h < 1 {
                break;
            }
            let rect = Rect::at(b.x1 + inset, b.y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut out, rect, BOX_COLOR);
        }
    }
    out
}

/// Shared stop flag, set from a Ctrl-C handler or by hand.
#[derive(Clone, Debug, Default)]
pub struct QuitSignal {
    flag: Arc<AtomicBool>,
}

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT/SIGTERM to this signal. Only one handler per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .context("install ctrl-c handler")
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_draws_green_outline_only() {
        let frame = RgbImage::from_pixel(40, 30, Rgb([10, 10, 10]));
        let out = annotate(&frame, &[BoundingBox::new(5, 5, 25, 20)]);
        assert_eq!(out.get_pixel(5, 5), &BOX_COLOR);
        assert_eq!(out.get_pixel(6, 6), &BOX_COLOR);
        assert_eq!(out.get_pixel(15, 12), &Rgb([10, 10, 10]));
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 10, 10]));
        assert_eq!(frame.get_pixel(5, 5), &Rgb([10, 10, 10]));
    }

    #[test]
    fn annotate_skips_reversed_boxes() {
        let frame = RgbImage::new(10, 10);
        let out = annotate(&frame, &[BoundingBox::new(8, 8, 2, 2)]);
        assert_eq!(out, frame);
    }

    #[test]
    fn report_overlays_its_own_boxes() {
        use crate::detect::MotionDetection;
        use image::GrayImage;
        use std::time::Duration;

        let working = RgbImage::from_pixel(40, 30, Rgb([10, 10, 10]));
        let outcome = FrameOutcome::Detected(MotionDetection {
            boxes: vec![BoundingBox::new(2, 3, 12, 13)],
            candidate_count: 1,
            mask: GrayImage::new(40, 30),
            delta: GrayImage::new(40, 30),
        });
        let report = FrameReport {
            sequence: 33,
            working: &working,
            outcome: &outcome,
            pace: PaceReport {
                busy: Duration::ZERO,
                waited: Duration::ZERO,
                overrun: false,
            },
        };
        let out = report.annotated();
        assert_eq!(out.get_pixel(2, 3), &BOX_COLOR);
        assert_eq!(out.get_pixel(7, 8), &Rgb([10, 10, 10]));

        let warming = FrameOutcome::WarmingUp {
            motion_len: 1,
            background_len: 0,
        };
        let report = FrameReport {
            outcome: &warming,
            ..report
        };
        assert_eq!(report.annotated(), working);
    }

    #[test]
    fn quit_signal_is_shared_between_clones() {
        let quit = QuitSignal::new();
        let handle = quit.clone();
        assert!(!quit.is_requested());
        handle.request();
        assert!(quit.is_requested());
    }
}
