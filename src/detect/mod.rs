//! Motion region extraction and box deduplication.

pub mod nms;
pub mod regions;
mod result;

pub use nms::non_max_suppression;
pub use regions::{MotionRegionExtractor, DEFAULT_DELTA_THRESHOLD};
pub use result::{BoundingBox, FrameOutcome, MotionDetection, RegionExtraction};
