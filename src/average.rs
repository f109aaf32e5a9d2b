//! Weighted temporal averaging.
//!
//! Pairing rule: frames and weights are zipped front to front, so when the
//! lengths differ only the first `min(frames, weights)` pairs are combined.
//! For a buffer snapshot that means the most recently pushed frames win. The
//! motion buffer relies on this: it holds `motion_window` frames against a
//! schedule of `motion_window - 1` weights, so only the newest
//! `motion_window - 1` frames enter the motion average.

use image::GrayImage;

use crate::error::MotionError;
use crate::frame::Frame;
use crate::weights::WeightSchedule;

/// Uniform inputs must average back to themselves despite float error.
const TRUNCATION_EPSILON: f64 = 1e-9;

/// Per-pixel `sum(frame_i * w_i) / sum(w_i)`, truncated to `u8`.
pub fn weighted_average<'a, I>(frames: I, weights: &WeightSchedule) -> Result<Frame, MotionError>
where
    I: IntoIterator<Item = &'a Frame>,
{
    let mut pairs = frames.into_iter().zip(weights.as_slice().iter().copied());

    let Some((first, first_weight)) = pairs.next() else {
        return Err(MotionError::BufferNotReady {
            have: 0,
            need: weights.len(),
        });
    };

    let (width, height) = first.dimensions();
    let mut acc: Vec<f64> = first
        .pixels()
        .iter()
        .map(|&p| p as f64 * first_weight)
        .collect();
    let mut weight_sum = first_weight;

    for (frame, weight) in pairs {
        if frame.dimensions() != (width, height) {
            return Err(MotionError::DimensionMismatch {
                expected: (width, height),
                found: frame.dimensions(),
            });
        }
        for (slot, &p) in acc.iter_mut().zip(frame.pixels()) {
            *slot += p as f64 * weight;
        }
        weight_sum += weight;
    }

    // `as u8` truncates toward zero and saturates, matching a uint8 cast.
    let pixels: Vec<u8> = acc
        .iter()
        .map(|v| (v / weight_sum + TRUNCATION_EPSILON) as u8)
        .collect();
    let image = GrayImage::from_raw(width, height, pixels).ok_or_else(|| {
        MotionError::DimensionMismatch {
            expected: (width, height),
            found: (width, height),
        }
    })?;
    Ok(Frame::new(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SlidingFrameBuffer;

    fn schedule(n: usize) -> WeightSchedule {
        WeightSchedule::linear(n, 1.0, 0.1).unwrap()
    }

    #[test]
    fn uniform_frames_average_to_themselves() {
        let frames: Vec<Frame> = (0..5).map(|_| Frame::filled(8, 6, 137)).collect();
        let avg = weighted_average(&frames, &schedule(5)).unwrap();
        assert_eq!(avg.dimensions(), (8, 6));
        assert!(avg.pixels().iter().all(|&p| p == 137));
    }

    #[test]
    fn recent_frames_dominate() {
        // weights [1.0, 0.1]: (200 * 1.0 + 0 * 0.1) / 1.1 = 181.8 -> 181
        let frames = vec![Frame::filled(2, 2, 200), Frame::filled(2, 2, 0)];
        let avg = weighted_average(&frames, &schedule(2)).unwrap();
        assert!(avg.pixels().iter().all(|&p| p == 181));
    }

    #[test]
    fn longer_buffer_is_truncated_to_newest_frames() {
        let mut buf = SlidingFrameBuffer::new(3).unwrap();
        buf.push_front(Frame::filled(2, 2, 255)); // oldest, ignored
        buf.push_front(Frame::filled(2, 2, 10));
        buf.push_front(Frame::filled(2, 2, 10));
        assert!(buf.is_full());

        let avg = weighted_average(buf.snapshot(), &schedule(2)).unwrap();
        assert!(avg.pixels().iter().all(|&p| p == 10));
    }

    #[test]
    fn averaging_is_deterministic() {
        let frames: Vec<Frame> = (0..30u32)
            .map(|i| {
                let img = GrayImage::from_fn(16, 16, |x, y| {
                    image::Luma([((x * 7 + y * 13 + i * 31) % 256) as u8])
                });
                Frame::new(img)
            })
            .collect();
        let weights = schedule(30);
        let a = weighted_average(&frames, &weights).unwrap();
        let b = weighted_average(&frames, &weights).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input_is_not_ready() {
        let frames: Vec<Frame> = Vec::new();
        assert_eq!(
            weighted_average(&frames, &schedule(3)),
            Err(MotionError::BufferNotReady { have: 0, need: 3 })
        );
    }

    #[test]
    fn mismatched_dimensions_are_reported() {
        let frames = vec![Frame::filled(4, 4, 1), Frame::filled(4, 5, 1)];
        assert!(matches!(
            weighted_average(&frames, &schedule(2)),
            Err(MotionError::DimensionMismatch { .. })
        ));
    }
}
