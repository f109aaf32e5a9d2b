//! Error kinds for the detector core.
//!
//! Only `InvalidConfiguration` is meant to reach the operator. The other
//! variants are absorbed by the pipeline with a fixed fallback (skip the
//! frame, clamp the value) so a single bad frame never ends the stream.
//! End-of-stream is not an error; see `pipeline::StreamEnd`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    /// A configuration value violates its constraint. Detected at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A buffer has not reached capacity yet; the frame produces no detection.
    #[error("buffer not ready: {have} of {need} frames")]
    BufferNotReady { have: usize, need: usize },

    /// A box with non-positive extent.
    #[error("degenerate box [{x1}, {y1}, {x2}, {y2}]")]
    DegenerateGeometry { x1: i32, y1: i32, x2: i32, y2: i32 },

    /// Frames of different resolution were combined.
    #[error("frame dimensions {found:?} do not match {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

impl MotionError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
