use image::GrayImage;
use imageproc::rect::Rect;

use crate::error::MotionError;

/// Axis-aligned box in working-frame pixel coordinates, corners inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rejects boxes whose corners are reversed.
    pub fn try_new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self, MotionError> {
        if x2 < x1 || y2 < y1 {
            return Err(MotionError::DegenerateGeometry { x1, y1, x2, y2 });
        }
        Ok(Self::new(x1, y1, x2, y2))
    }

    /// `[x, y, x + w, y + h]` from a bounding rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(
            rect.left(),
            rect.top(),
            rect.left() + rect.width() as i32,
            rect.top() + rect.height() as i32,
        )
    }

    /// `(x2 - x1 + 1) * (y2 - y1 + 1)`, which is non-positive for reversed corners.
    pub fn raw_area(&self) -> i64 {
        (self.x2 as i64 - self.x1 as i64 + 1) * (self.y2 as i64 - self.y1 as i64 + 1)
    }

    pub fn is_degenerate(&self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// Output of the region extractor for one frame.
#[derive(Clone, Debug)]
pub struct RegionExtraction {
    /// Boxes that passed the area filter, in contour discovery order.
    pub candidates: Vec<BoundingBox>,
    /// Thresholded and dilated difference image.
    pub mask: GrayImage,
    /// Absolute difference between the motion and background averages.
    pub delta: GrayImage,
}

/// Detection result for a frame processed with both buffers full.
#[derive(Clone, Debug)]
pub struct MotionDetection {
    /// Deduplicated boxes, in the order NMS kept them.
    pub boxes: Vec<BoundingBox>,
    /// Number of raw candidates fed into NMS.
    pub candidate_count: usize,
    pub mask: GrayImage,
    pub delta: GrayImage,
}

/// What the pipeline did with one frame.
#[derive(Clone, Debug)]
pub enum FrameOutcome {
    /// A buffer is still filling; no detection is attempted.
    WarmingUp {
        motion_len: usize,
        background_len: usize,
    },
    Detected(MotionDetection),
    /// The frame was unusable and dropped; the stream continues.
    Skipped { reason: MotionError },
}

impl FrameOutcome {
    pub fn boxes(&self) -> &[BoundingBox] {
        match self {
            FrameOutcome::Detected(detection) => &detection.boxes,
            _ => &[],
        }
    }

    pub fn detection(&self) -> Option<&MotionDetection> {
        match self {
            FrameOutcome::Detected(detection) => Some(detection),
            _ => None,
        }
    }

    pub fn is_warming_up(&self) -> bool {
        matches!(self, FrameOutcome::WarmingUp { .. })
    }
}
