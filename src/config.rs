use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detect::DEFAULT_DELTA_THRESHOLD;
use crate::error::MotionError;
use crate::frame::DEFAULT_MOTION_WINDOW;
use crate::imaging::PreprocessSettings;
use crate::pacing::{frame_interval, PacingStrategy};
use crate::weights::{DEFAULT_WEIGHT_END, DEFAULT_WEIGHT_START};

const DEFAULT_SOURCE: &str = "/dev/video0";
const DEFAULT_MIN_AREA: u32 = 1000;
const DEFAULT_FRAME_RATE: f64 = 25.0;
const DEFAULT_DILATION_ITERATIONS: u8 = 4;
const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.2;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    source: Option<String>,
    min_area: Option<u32>,
    frame_rate: Option<f64>,
    dilation_iterations: Option<u8>,
    overlap_threshold: Option<f64>,
    motion_window: Option<usize>,
    delta_threshold: Option<u8>,
    pacing: Option<PacingStrategy>,
    preprocess: Option<PreprocessConfigFile>,
    weights: Option<WeightsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PreprocessConfigFile {
    resize_width: Option<u32>,
    contrast_gain: Option<f32>,
    contrast_bias: Option<f32>,
    blur_kernel: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct WeightsConfigFile {
    start: Option<f64>,
    end: Option<f64>,
}

/// Run configuration. Read-only once the pipeline is built.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Frame source location (device node, video file, image directory, `stub://...`).
    pub source: String,
    /// Smallest contour area, in pixels², that produces a box.
    pub min_area: u32,
    /// Target frames per second for pacing.
    pub frame_rate: f64,
    pub dilation_iterations: u8,
    /// NMS overlap threshold in `[0, 1]`.
    pub overlap_threshold: f64,
    /// Motion buffer capacity in frames.
    pub motion_window: usize,
    /// Frame delta binarization level.
    pub delta_threshold: u8,
    pub pacing: PacingStrategy,
    pub preprocess: PreprocessSettings,
    pub weights: WeightRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRange {
    pub start: f64,
    pub end: f64,
}

impl Default for WeightRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_WEIGHT_START,
            end: DEFAULT_WEIGHT_END,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            min_area: DEFAULT_MIN_AREA,
            frame_rate: DEFAULT_FRAME_RATE,
            dilation_iterations: DEFAULT_DILATION_ITERATIONS,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            motion_window: DEFAULT_MOTION_WINDOW,
            delta_threshold: DEFAULT_DELTA_THRESHOLD,
            pacing: PacingStrategy::default(),
            preprocess: PreprocessSettings::default(),
            weights: WeightRange::default(),
        }
    }
}

/// Command-line overrides, applied after the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<String>,
    pub min_area: Option<u32>,
    pub frame_rate: Option<f64>,
    pub dilation_iterations: Option<u8>,
    pub overlap_threshold: Option<f64>,
    pub motion_window: Option<usize>,
    pub pacing: Option<PacingStrategy>,
}

impl DetectorConfig {
    /// Defaults, then `MOTION_CONFIG` (if set), then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTION_CONFIG").ok();
        Self::load_with(config_path.as_deref().map(Path::new), ConfigOverrides::default())
    }

    /// Full layering: file at `path`, environment, then `overrides`, then validation.
    pub fn load_with(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.apply_overrides(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DetectorConfigFile) -> Self {
        let defaults = Self::default();
        let preprocess = file.preprocess.unwrap_or_default();
        let weights = file.weights.unwrap_or_default();
        Self {
            source: file.source.unwrap_or(defaults.source),
            min_area: file.min_area.unwrap_or(defaults.min_area),
            frame_rate: file.frame_rate.unwrap_or(defaults.frame_rate),
            dilation_iterations: file
                .dilation_iterations
                .unwrap_or(defaults.dilation_iterations),
            overlap_threshold: file.overlap_threshold.unwrap_or(defaults.overlap_threshold),
            motion_window: file.motion_window.unwrap_or(defaults.motion_window),
            delta_threshold: file.delta_threshold.unwrap_or(defaults.delta_threshold),
            pacing: file.pacing.unwrap_or(defaults.pacing),
            preprocess: PreprocessSettings {
                resize_width: preprocess
                    .resize_width
                    .unwrap_or(defaults.preprocess.resize_width),
                contrast_gain: preprocess
                    .contrast_gain
                    .unwrap_or(defaults.preprocess.contrast_gain),
                contrast_bias: preprocess
                    .contrast_bias
                    .unwrap_or(defaults.preprocess.contrast_bias),
                blur_kernel: preprocess
                    .blur_kernel
                    .unwrap_or(defaults.preprocess.blur_kernel),
            },
            weights: WeightRange {
                start: weights.start.unwrap_or(defaults.weights.start),
                end: weights.end.unwrap_or(defaults.weights.end),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("MOTION_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Some(value) = parse_env("MOTION_MIN_AREA")? {
            self.min_area = value;
        }
        if let Some(value) = parse_env("MOTION_FRAME_RATE")? {
            self.frame_rate = value;
        }
        if let Some(value) = parse_env("MOTION_DILATION_ITERATIONS")? {
            self.dilation_iterations = value;
        }
        if let Some(value) = parse_env("MOTION_OVERLAP_THRESHOLD")? {
            self.overlap_threshold = value;
        }
        if let Some(value) = parse_env("MOTION_WINDOW")? {
            self.motion_window = value;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(source) = overrides.source {
            self.source = source;
        }
        if let Some(min_area) = overrides.min_area {
            self.min_area = min_area;
        }
        if let Some(frame_rate) = overrides.frame_rate {
            self.frame_rate = frame_rate;
        }
        if let Some(iterations) = overrides.dilation_iterations {
            self.dilation_iterations = iterations;
        }
        if let Some(threshold) = overrides.overlap_threshold {
            self.overlap_threshold = threshold;
        }
        if let Some(window) = overrides.motion_window {
            self.motion_window = window;
        }
        if let Some(pacing) = overrides.pacing {
            self.pacing = pacing;
        }
    }

    /// Check every constraint. Nothing is processed with an invalid config.
    pub fn validate(&self) -> Result<(), MotionError> {
        if self.source.trim().is_empty() {
            return Err(MotionError::invalid("source must not be empty"));
        }
        if self.motion_window < 2 {
            return Err(MotionError::invalid(format!(
                "motion_window must be at least 2, got {}",
                self.motion_window
            )));
        }
        frame_interval(self.frame_rate)?;
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(MotionError::invalid(format!(
                "overlap_threshold must be within [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if self.preprocess.resize_width == 0 {
            return Err(MotionError::invalid("resize_width must be greater than zero"));
        }
        if self.preprocess.blur_kernel % 2 == 0 {
            return Err(MotionError::invalid(format!(
                "blur_kernel must be odd, got {}",
                self.preprocess.blur_kernel
            )));
        }
        if !self.preprocess.contrast_gain.is_finite() || !self.preprocess.contrast_bias.is_finite()
        {
            return Err(MotionError::invalid("contrast settings must be finite"));
        }
        let WeightRange { start, end } = self.weights;
        if !start.is_finite() || !end.is_finite() || end <= 0.0 || start < end {
            return Err(MotionError::invalid(format!(
                "weights must satisfy start >= end > 0 (start={}, end={})",
                start, end
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<DetectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: DetectorConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
