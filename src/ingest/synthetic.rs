//! Synthetic scenes (`stub://`) for tests and the demo.
//!
//! `stub://square` renders a static gray background with a bright square that
//! appears at `square_start` and then slides right by `square_step` pixels
//! per frame. Any other `stub://` name renders the background alone.

use anyhow::Result;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::frame::RawFrame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticScene {
    Static,
    MovingSquare,
}

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub location: String,
    pub scene: SyntheticScene,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames; `None` streams forever.
    pub frames: Option<u64>,
    pub background: u8,
    pub square_value: u8,
    pub square_side: u32,
    /// First frame (1-based) containing the square.
    pub square_start: u64,
    pub square_step: u32,
    /// Uniform per-pixel noise amplitude; 0 disables noise.
    pub noise: u8,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            location: "stub://static".to_string(),
            scene: SyntheticScene::Static,
            width: 320,
            height: 240,
            frames: None,
            background: 60,
            square_value: 230,
            square_side: 50,
            square_start: 31,
            square_step: 5,
            noise: 0,
            seed: 0,
        }
    }
}

impl SyntheticConfig {
    pub fn from_location(location: &str) -> Self {
        let scene = if location.trim_start_matches("stub://").starts_with("square") {
            SyntheticScene::MovingSquare
        } else {
            SyntheticScene::Static
        };
        Self {
            location: location.to_string(),
            scene,
            ..Self::default()
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            frame_count: 0,
            rng,
        }
    }

    /// Square origin for a 1-based frame index, if the square is visible.
    pub fn square_origin(&self, frame: u64) -> Option<(u32, u32)> {
        if self.config.scene != SyntheticScene::MovingSquare || frame < self.config.square_start {
            return None;
        }
        let offset = (frame - self.config.square_start) as u32 * self.config.square_step;
        let x = self.config.width / 10 + offset;
        let y = self.config.height.saturating_sub(self.config.square_side) / 2;
        Some((x, y))
    }

    fn render(&mut self) -> RgbImage {
        let cfg = &self.config;
        let square = self.square_origin(self.frame_count);
        let side = cfg.square_side;
        let (background, square_value, noise) = (cfg.background, cfg.square_value, cfg.noise);

        let mut image = RgbImage::from_fn(cfg.width, cfg.height, |x, y| {
            let lit = square.is_some_and(|(sx, sy)| {
                x >= sx && x < sx.saturating_add(side) && y >= sy && y < sy.saturating_add(side)
            });
            let v = if lit { square_value } else { background };
            Rgb([v, v, v])
        });

        if noise > 0 {
            let amplitude = noise as i16;
            for pixel in image.pixels_mut() {
                let jitter = self.rng.gen_range(-amplitude..=amplitude);
                let v = (pixel.0[0] as i16 + jitter).clamp(0, 255) as u8;
                *pixel = Rgb([v, v, v]);
            }
        }
        image
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{}, {:?})",
            self.config.location,
            self.config.width,
            self.config.height,
            self.config.scene
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if self
            .config
            .frames
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        self.frame_count += 1;
        let image = self.render();
        Ok(Some(RawFrame::new(image, self.frame_count)))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            location: self.config.location.clone(),
        }
    }
}
