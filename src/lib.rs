//! Temporal dual-buffer motion detector.
//!
//! Moving regions are found by comparing a short-term ("motion") weighted
//! average of the newest frames against a long-term ("background") weighted
//! average of older frames. Regions that differ become bounding boxes, which
//! a containment-biased non-maximum suppression then deduplicates.
//!
//! # Module Structure
//!
//! - `frame`: `RawFrame`, `Frame` and the bounded `SlidingFrameBuffer`
//! - `weights`: linear weight schedules
//! - `average`: weighted temporal averaging
//! - `imaging`: image primitives and the per-frame `Preprocessor`
//! - `detect`: region extraction, NMS and per-frame outcome types
//! - `pacing`: frame-rate pacing
//! - `pipeline`: `MotionPipeline`, the main loop
//! - `ingest`: frame sources (synthetic, image sequence, video file, V4L2)
//! - `sink`: presentation sinks, box overlay, quit signal
//! - `config`: layered `DetectorConfig`

pub mod average;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod imaging;
pub mod ingest;
pub mod pacing;
pub mod pipeline;
pub mod sink;
pub mod weights;

pub use average::weighted_average;
pub use config::{ConfigOverrides, DetectorConfig, WeightRange};
pub use detect::{
    non_max_suppression, BoundingBox, FrameOutcome, MotionDetection, MotionRegionExtractor,
    RegionExtraction,
};
pub use error::MotionError;
pub use frame::{Frame, RawFrame, SlidingFrameBuffer, BACKGROUND_WINDOW, DEFAULT_MOTION_WINDOW};
pub use imaging::{PreprocessSettings, Preprocessed, Preprocessor};
pub use ingest::{open_source, FileConfig, FileSource, FrameSource, SourceStats};
pub use ingest::{SyntheticConfig, SyntheticScene, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::{V4l2Config, V4l2Source};
pub use pacing::{FramePacer, PaceReport, PacingStrategy};
pub use pipeline::{MotionPipeline, ProcessedFrame, RunSummary, StreamEnd};
pub use sink::{annotate, FrameReport, LogSink, PresentationSink, QuitSignal, SinkControl};
pub use weights::WeightSchedule;
