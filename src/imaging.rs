//! Image primitives and frame preprocessing.
//!
//! Thin wrappers over `image` and `imageproc` so the detector stages only
//! deal with `Frame`, `GrayImage` and `RgbImage`.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::map::{map_colors, map_colors2};
use imageproc::morphology;
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::error::MotionError;
use crate::frame::Frame;

pub const DEFAULT_RESIZE_WIDTH: u32 = 500;
pub const DEFAULT_CONTRAST_GAIN: f32 = 1.3;
pub const DEFAULT_CONTRAST_BIAS: f32 = 10.0;
pub const DEFAULT_BLUR_KERNEL: u32 = 21;

/// Aspect-preserving resize to `width` columns.
pub fn resize(frame: &RgbImage, width: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    if width == 0 || w == 0 || w == width {
        return frame.clone();
    }
    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    imageops::resize(frame, width, height, FilterType::Triangle)
}

/// Saturating `|v * gain + bias|` per channel.
pub fn adjust_contrast(frame: &RgbImage, gain: f32, bias: f32) -> RgbImage {
    map_colors(frame, |Rgb(channels)| {
        Rgb(channels.map(|c| (c as f32 * gain + bias).abs().round().min(255.0) as u8))
    })
}

pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    imageops::grayscale(frame)
}

/// Gaussian blur for an odd square kernel. Sigma follows the usual
/// kernel-size derivation `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
pub fn blur(frame: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return frame.clone();
    }
    let sigma = 0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    gaussian_blur_f32(frame, sigma)
}

pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, MotionError> {
    if a.dimensions() != b.dimensions() {
        return Err(MotionError::DimensionMismatch {
            expected: a.dimensions(),
            found: b.dimensions(),
        });
    }
    Ok(map_colors2(a, b, |Luma([p]), Luma([q])| Luma([p.abs_diff(q)])))
}

/// Pixels strictly above `value` become `max`, the rest 0.
pub fn threshold(frame: &GrayImage, value: u8, max: u8) -> GrayImage {
    map_colors(frame, |Luma([p])| Luma([if p > value { max } else { 0 }]))
}

/// `iterations` passes of a 3x3 square dilation.
pub fn dilate(binary: &GrayImage, iterations: u8) -> GrayImage {
    if iterations == 0 {
        return binary.clone();
    }
    // A chessboard radius of k equals k passes of the 3x3 kernel.
    morphology::dilate(binary, Norm::LInf, iterations)
}

/// Outermost borders only; holes and nested regions are skipped.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Upright bounding rectangle `(x, y, w, h)`; `None` for an empty contour.
pub fn bounding_rect(contour: &Contour<i32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let width = (max_x - min_x + 1) as u32;
    let height = (max_y - min_y + 1) as u32;
    Some(Rect::at(min_x, min_y).of_size(width, height))
}

/// Polygon area enclosed by the border points (shoelace formula).
pub fn contour_area(contour: &Contour<i32>) -> f64 {
    polygon_area(&contour.points)
}

fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

// ----------------------------------------------------------------------------
// Preprocessor
// ----------------------------------------------------------------------------

/// Preprocessing settings applied to every acquired frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessSettings {
    pub resize_width: u32,
    pub contrast_gain: f32,
    pub contrast_bias: f32,
    pub blur_kernel: u32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            resize_width: DEFAULT_RESIZE_WIDTH,
            contrast_gain: DEFAULT_CONTRAST_GAIN,
            contrast_bias: DEFAULT_CONTRAST_BIAS,
            blur_kernel: DEFAULT_BLUR_KERNEL,
        }
    }
}

/// Output of preprocessing: the working color frame plus the detector input.
pub struct Preprocessed {
    /// Resized, contrast-adjusted color frame. Boxes are in its coordinates.
    pub working: RgbImage,
    pub frame: Frame,
}

#[derive(Clone, Debug)]
pub struct Preprocessor {
    settings: PreprocessSettings,
}

impl Preprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PreprocessSettings {
        &self.settings
    }

    /// resize -> contrast -> grayscale -> blur
    pub fn process(&self, color: &RgbImage) -> Preprocessed {
        let resized = resize(color, self.settings.resize_width);
        let working = adjust_contrast(
            &resized,
            self.settings.contrast_gain,
            self.settings.contrast_bias,
        );
        let gray = to_grayscale(&working);
        let frame = Frame::new(blur(&gray, self.settings.blur_kernel));
        Preprocessed { working, frame }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mask(width: u32, height: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = x >= x0 && x < x0 + side && y >= y0 && y < y0 + side;
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn resize_keeps_aspect_ratio() {
        let img = RgbImage::new(1000, 600);
        let out = resize(&img, 500);
        assert_eq!(out.dimensions(), (500, 300));
    }

    #[test]
    fn contrast_saturates() {
        let img = RgbImage::from_pixel(2, 2, Rgb([0, 100, 250]));
        let out = adjust_contrast(&img, 1.3, 10.0);
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 140, 255]));
    }

    #[test]
    fn threshold_is_strict() {
        let img = GrayImage::from_raw(3, 1, vec![19, 20, 21]).unwrap();
        let out = threshold(&img, 20, 255);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn abs_diff_is_symmetric() {
        let a = GrayImage::from_raw(2, 1, vec![10, 200]).unwrap();
        let b = GrayImage::from_raw(2, 1, vec![30, 50]).unwrap();
        assert_eq!(abs_diff(&a, &b).unwrap().as_raw(), &vec![20, 150]);
        assert_eq!(abs_diff(&b, &a).unwrap().as_raw(), &vec![20, 150]);
        assert!(abs_diff(&a, &GrayImage::new(1, 1)).is_err());
    }

    #[test]
    fn dilation_grows_by_iterations() {
        let mask = square_mask(20, 20, 10, 10, 1);
        let grown = dilate(&mask, 2);
        let lit = grown.pixels().filter(|p| p.0[0] > 0).count();
        assert_eq!(lit, 25);
        assert_eq!(dilate(&mask, 0), mask);
    }

    #[test]
    fn external_contour_of_square() {
        let mask = square_mask(40, 40, 5, 8, 10);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);

        let rect = bounding_rect(&contours[0]).unwrap();
        assert_eq!((rect.left(), rect.top()), (5, 8));
        assert_eq!((rect.width(), rect.height()), (10, 10));
        // Border pixel centres enclose a 9x9 polygon.
        assert_eq!(contour_area(&contours[0]), 81.0);
    }

    #[test]
    fn nested_regions_yield_one_external_contour() {
        // Ring with an island inside the hole.
        let mask = GrayImage::from_fn(30, 30, |x, y| {
            let ring = (2..28).contains(&x) && (2..28).contains(&y)
                && !((6..24).contains(&x) && (6..24).contains(&y));
            let island = (12..18).contains(&x) && (12..18).contains(&y);
            Luma([if ring || island { 255 } else { 0 }])
        });
        assert_eq!(find_external_contours(&mask).len(), 1);
    }

    #[test]
    fn preprocessor_outputs_working_resolution() {
        let pre = Preprocessor::new(PreprocessSettings::default());
        let out = pre.process(&RgbImage::from_pixel(1000, 500, Rgb([40, 40, 40])));
        assert_eq!(out.working.dimensions(), (500, 250));
        assert_eq!(out.frame.dimensions(), (500, 250));
    }
}
