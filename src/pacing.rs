//! Frame-rate pacing.
//!
//! Each frame's budget is measured from its own loop start, so an overrun on
//! one frame is never paid back by shortening the next.

use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::error::MotionError;

/// Slack left for the spin phase of `PacingStrategy::Sleep`.
const SLEEP_SLACK: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingStrategy {
    /// Busy-wait on the monotonic clock.
    #[default]
    Spin,
    /// Sleep for most of the remaining budget, then spin.
    Sleep,
}

impl std::str::FromStr for PacingStrategy {
    type Err = MotionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spin" => Ok(Self::Spin),
            "sleep" => Ok(Self::Sleep),
            other => Err(MotionError::invalid(format!(
                "unknown pacing strategy '{}' (expected spin or sleep)",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaceReport {
    /// Time spent on the frame before pacing.
    pub busy: Duration,
    /// Time spent waiting.
    pub waited: Duration,
    /// The frame used its whole budget or more.
    pub overrun: bool,
}

#[derive(Clone, Debug)]
pub struct FramePacer {
    interval: Duration,
    strategy: PacingStrategy,
}

/// Per-frame budget for `frame_rate`. Rates whose period does not fit in a
/// `Duration` are rejected along with non-positive ones.
pub fn frame_interval(frame_rate: f64) -> Result<Duration, MotionError> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(MotionError::invalid(format!(
            "frame_rate must be a positive number, got {}",
            frame_rate
        )));
    }
    Duration::try_from_secs_f64(1.0 / frame_rate).map_err(|e| {
        MotionError::invalid(format!(
            "frame_rate {} gives an unrepresentable frame interval: {}",
            frame_rate, e
        ))
    })
}

impl FramePacer {
    pub fn new(frame_rate: f64, strategy: PacingStrategy) -> Result<Self, MotionError> {
        Ok(Self {
            interval: frame_interval(frame_rate)?,
            strategy,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn strategy(&self) -> PacingStrategy {
        self.strategy
    }

    /// Block until one interval has passed since `loop_start`.
    pub fn pace(&self, loop_start: Instant) -> PaceReport {
        let busy = loop_start.elapsed();
        if busy >= self.interval {
            return PaceReport {
                busy,
                waited: Duration::ZERO,
                overrun: true,
            };
        }

        let deadline = loop_start + self.interval;
        if self.strategy == PacingStrategy::Sleep {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining > SLEEP_SLACK {
                std::thread::sleep(remaining - SLEEP_SLACK);
            }
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }

        PaceReport {
            busy,
            waited: loop_start.elapsed().saturating_sub(busy),
            overrun: false,
        }
    }
}
