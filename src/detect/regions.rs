use crate::detect::result::{BoundingBox, RegionExtraction};
use crate::error::MotionError;
use crate::frame::Frame;
use crate::imaging;

/// Default binarization level for the frame delta, on a 0..=255 scale.
pub const DEFAULT_DELTA_THRESHOLD: u8 = 20;

/// Turns a pair of averaged frames into raw candidate boxes.
#[derive(Clone, Debug)]
pub struct MotionRegionExtractor {
    min_area: f64,
    dilation_iterations: u8,
    delta_threshold: u8,
}

impl MotionRegionExtractor {
    pub fn new(min_area: u32, dilation_iterations: u8, delta_threshold: u8) -> Self {
        Self {
            min_area: min_area as f64,
            dilation_iterations,
            delta_threshold,
        }
    }

    /// absdiff -> threshold -> dilate -> external contours -> area filter.
    pub fn extract(
        &self,
        motion_avg: &Frame,
        background_avg: &Frame,
    ) -> Result<RegionExtraction, MotionError> {
        let delta = imaging::abs_diff(background_avg.image(), motion_avg.image())?;
        let binary = imaging::threshold(&delta, self.delta_threshold, u8::MAX);
        let mask = imaging::dilate(&binary, self.dilation_iterations);

        let contours = imaging::find_external_contours(&mask);
        let total = contours.len();
        let candidates: Vec<BoundingBox> = contours
            .iter()
            .filter(|c| imaging::contour_area(c) >= self.min_area)
            .filter_map(imaging::bounding_rect)
            .map(BoundingBox::from_rect)
            .collect();

        log::trace!(
            "extractor: {} contours, {} above min area {}",
            total,
            candidates.len(),
            self.min_area
        );

        Ok(RegionExtraction {
            candidates,
            mask,
            delta,
        })
    }
}
