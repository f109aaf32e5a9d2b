//! Local file frame source.
//!
//! A directory is read as an ordered image sequence (PNG/JPEG, sorted by file
//! name). A regular file is decoded as video and needs the
//! `ingest-file-ffmpeg` feature. Remote URLs are never fetched.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{FrameSource, SourceStats};
use crate::frame::RawFrame;

const SEQUENCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local path to a video file or a directory of still frames.
    pub path: String,
    /// Nominal frame rate (frames per second), used for stall detection.
    pub target_fps: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            target_fps: 25,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Sequence(ImageSequenceSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let path = Path::new(&config.path);
        if path.is_dir() {
            return Ok(Self {
                backend: FileBackend::Sequence(ImageSequenceSource::new(config)?),
            });
        }
        if !path.exists() {
            return Err(anyhow!("source '{}' does not exist", config.path));
        }
        #[cfg(feature = "ingest-file-ffmpeg")]
        {
            Ok(Self {
                backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
            })
        }
        #[cfg(not(feature = "ingest-file-ffmpeg"))]
        {
            Err(anyhow!(
                "video file decoding requires the ingest-file-ffmpeg feature"
            ))
        }
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Sequence(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        match &mut self.backend {
            FileBackend::Sequence(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            FileBackend::Sequence(source) => source.is_healthy(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.is_healthy(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            FileBackend::Sequence(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Still-image sequence
// ----------------------------------------------------------------------------

struct ImageSequenceSource {
    config: FileConfig,
    files: Vec<PathBuf>,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageSequenceSource {
    fn new(config: FileConfig) -> Result<Self> {
        let files = list_sequence(Path::new(&config.path))?;
        Ok(Self {
            config,
            files,
            frame_count: 0,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        if self.files.is_empty() {
            return Err(anyhow!(
                "no png/jpeg frames found in directory '{}'",
                self.config.path
            ));
        }
        log::info!(
            "FileSource: connected to {} (image sequence, {} frames)",
            self.config.path,
            self.files.len()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let Some(path) = self.files.get(self.frame_count as usize) else {
            return Ok(None);
        };
        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(err).with_context(|| format!("decode frame {}", path.display()));
            }
        };
        self.frame_count += 1;
        Ok(Some(RawFrame::new(image, self.frame_count)))
    }

    fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            location: self.config.path.clone(),
        }
    }
}

fn list_sequence(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                SEQUENCE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);
        if is_frame && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    !path.contains("://")
}
