//! Frame containers.
//!
//! - `RawFrame`: color frame as delivered by a frame source.
//! - `Frame`: preprocessed single-channel frame. Immutable once built.
//! - `SlidingFrameBuffer`: bounded most-recent-first window of `Frame`s.
//!
//! A `Frame` is moved from the motion buffer into the background buffer on
//! eviction and dropped when it falls out of the background buffer. No
//! pipeline stage clones or mutates one.

use image::{GrayImage, RgbImage};
use std::collections::VecDeque;
use std::time::Instant;

use crate::error::MotionError;

/// Fixed capacity of the background buffer.
pub const BACKGROUND_WINDOW: usize = 30;

/// Default capacity of the motion buffer.
pub const DEFAULT_MOTION_WINDOW: usize = 3;

// ----------------------------------------------------------------------------
// RawFrame: acquired color frame
// ----------------------------------------------------------------------------

/// Color frame produced by a `FrameSource`.
pub struct RawFrame {
    image: RgbImage,

    /// Position in the stream, starting at 1.
    pub sequence: u64,

    /// Monotonic capture instant.
    pub captured_at: Instant,
}

impl RawFrame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

// ----------------------------------------------------------------------------
// Frame: preprocessed grayscale frame
// ----------------------------------------------------------------------------

/// Single-channel 8-bit frame. There is no mutable accessor.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    image: GrayImage,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Self { image }
    }

    /// Uniform frame, mostly for tests and synthetic scenes.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::new(GrayImage::from_pixel(width, height, image::Luma([value])))
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

// ----------------------------------------------------------------------------
// SlidingFrameBuffer: bounded FIFO window
// ----------------------------------------------------------------------------

/// Bounded ordered window of frames, front = most recent.
///
/// Holds at most `capacity` frames. A push that would exceed capacity
/// removes the oldest (back) frame and hands it to the caller. Nothing else
/// ever drops a frame.
#[derive(Debug)]
pub struct SlidingFrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl SlidingFrameBuffer {
    pub fn new(capacity: usize) -> Result<Self, MotionError> {
        if capacity == 0 {
            return Err(MotionError::invalid("buffer capacity must be at least 1"));
        }
        Ok(Self {
            // One spare slot: the push lands before the eviction.
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
        })
    }

    /// Insert at the front. Returns the evicted frame once at capacity.
    pub fn push_front(&mut self, frame: Frame) -> Option<Frame> {
        self.frames.push_front(frame);
        if self.frames.len() > self.capacity {
            self.frames.pop_back()
        } else {
            None
        }
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Front-to-back view of the buffered frames.
    pub fn snapshot(&self) -> impl ExactSizeIterator<Item = &Frame> + Clone + '_ {
        self.frames.iter()
    }

    pub fn front(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
