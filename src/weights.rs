//! Recency weight schedules for the temporal averages.

use crate::error::MotionError;

pub const DEFAULT_WEIGHT_START: f64 = 1.0;
pub const DEFAULT_WEIGHT_END: f64 = 0.1;

/// Linearly spaced weights, most recent frame first.
///
/// Built once per buffer at configuration time and never modified. Index 0
/// pairs with the front of a `SlidingFrameBuffer`.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightSchedule {
    weights: Vec<f64>,
}

impl WeightSchedule {
    /// `w[i] = start + (end - start) * i / (n - 1)` for `i` in `0..n`.
    ///
    /// The first and last elements are exactly `start` and `end`.
    pub fn linear(n: usize, start: f64, end: f64) -> Result<Self, MotionError> {
        if n < 2 {
            return Err(MotionError::invalid(format!(
                "weight schedule needs at least 2 weights, got {}",
                n
            )));
        }
        if !start.is_finite() || !end.is_finite() {
            return Err(MotionError::invalid("weights must be finite"));
        }
        if end <= 0.0 || start < end {
            return Err(MotionError::invalid(format!(
                "weights must satisfy start >= end > 0 (start={}, end={})",
                start, end
            )));
        }

        let last = (n - 1) as f64;
        let mut weights: Vec<f64> = (0..n)
            .map(|i| start + (end - start) * (i as f64 / last))
            .collect();
        // Pin the tail so float error never leaks into the endpoint.
        weights[n - 1] = end;
        Ok(Self { weights })
    }

    /// Schedule for a buffer of `capacity` frames that averages all but the
    /// oldest. A single weight is just `start`.
    pub fn trailing(capacity: usize, start: f64, end: f64) -> Result<Self, MotionError> {
        match capacity {
            0 | 1 => Err(MotionError::invalid(format!(
                "window needs at least 2 frames, got {}",
                capacity
            ))),
            2 => {
                Self::linear(2, start, end)?;
                Ok(Self {
                    weights: vec![start],
                })
            }
            n => Self::linear(n - 1, start, end),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        for n in 2..64 {
            let schedule = WeightSchedule::linear(n, 1.0, 0.1).unwrap();
            assert_eq!(schedule.len(), n);
            assert_eq!(schedule.as_slice()[0], 1.0);
            assert_eq!(schedule.as_slice()[n - 1], 0.1);
        }
    }

    #[test]
    fn schedule_is_non_increasing() {
        for n in 2..64 {
            let schedule = WeightSchedule::linear(n, 1.0, 0.1).unwrap();
            for pair in schedule.as_slice().windows(2) {
                assert!(pair[0] >= pair[1], "{:?}", schedule);
            }
        }
    }

    #[test]
    fn two_weights_span_the_range() {
        let schedule = WeightSchedule::linear(2, 1.0, 0.1).unwrap();
        assert_eq!(schedule.as_slice(), &[1.0, 0.1]);
    }

    #[test]
    fn flat_schedule_is_allowed() {
        let schedule = WeightSchedule::linear(4, 0.5, 0.5).unwrap();
        assert!(schedule.as_slice().iter().all(|w| *w == 0.5));
        assert_eq!(schedule.sum(), 2.0);
    }

    #[test]
    fn trailing_schedule_drops_one_weight() {
        let schedule = WeightSchedule::trailing(3, 1.0, 0.1).unwrap();
        assert_eq!(schedule.as_slice(), &[1.0, 0.1]);
        let schedule = WeightSchedule::trailing(7, 1.0, 0.1).unwrap();
        assert_eq!(schedule, WeightSchedule::linear(6, 1.0, 0.1).unwrap());
    }

    #[test]
    fn two_frame_window_keeps_only_the_start_weight() {
        let schedule = WeightSchedule::trailing(2, 1.0, 0.1).unwrap();
        assert_eq!(schedule.as_slice(), &[1.0]);
        assert!(WeightSchedule::trailing(2, 0.1, 1.0).is_err());
        assert!(WeightSchedule::trailing(1, 1.0, 0.1).is_err());
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            WeightSchedule::linear(1, 1.0, 0.1),
            Err(MotionError::InvalidConfiguration(_))
        ));
        assert!(WeightSchedule::linear(0, 1.0, 0.1).is_err());
        assert!(WeightSchedule::linear(3, 0.1, 1.0).is_err());
        assert!(WeightSchedule::linear(3, 1.0, 0.0).is_err());
        assert!(WeightSchedule::linear(3, f64::NAN, 0.1).is_err());
    }
}
