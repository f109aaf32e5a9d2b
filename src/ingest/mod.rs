//! Frame sources.
//!
//! - Synthetic scenes (`stub://...`) for tests and the demo
//! - Local still-image sequences (a directory of PNG/JPEG files)
//! - Local video files (feature: ingest-file-ffmpeg)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//!
//! Sources deliver frames in temporal order. `Ok(None)` from `next_frame`
//! marks the end of the stream; an error ends it too, since the pipeline
//! never retries an acquisition.

use anyhow::{anyhow, Result};

use crate::frame::RawFrame;

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use file::{FileConfig, FileSource};
pub use synthetic::{SyntheticConfig, SyntheticScene, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Counters shared by every source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub location: String,
}

/// Ordered producer of color frames.
pub trait FrameSource {
    /// Open the underlying device or file.
    fn connect(&mut self) -> Result<()>;

    /// Next frame, or `None` once the stream is exhausted. May block.
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Pick a source implementation from a location string.
///
/// `stub://<scene>` is synthetic, `/dev/video*` is a camera, anything else
/// without a URL scheme is a local file or directory.
pub fn open_source(location: &str, target_fps: u32) -> Result<Box<dyn FrameSource>> {
    if location.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(SyntheticConfig::from_location(
            location,
        ))));
    }
    if location.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(V4l2Config {
                device: location.to_string(),
                target_fps,
                ..V4l2Config::default()
            })?));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            return Err(anyhow!(
                "camera capture from {} requires the ingest-v4l2 feature",
                location
            ));
        }
    }
    if location.contains("://") {
        return Err(anyhow!(
            "unsupported source '{}': only local files, devices and stub:// scenes",
            location
        ));
    }
    Ok(Box::new(FileSource::new(FileConfig {
        path: location.to_string(),
        target_fps,
    })?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_locations_open_synthetic_sources() -> Result<()> {
        let mut source = open_source("stub://static", 25)?;
        source.connect()?;
        let frame = source.next_frame()?.expect("synthetic frame");
        assert_eq!(frame.sequence, 1);
        assert_eq!(source.stats().location, "stub://static");
        Ok(())
    }

    #[test]
    fn remote_urls_are_rejected() {
        assert!(open_source("rtsp://camera/stream", 25).is_err());
        assert!(open_source("http://example.com/video.mp4", 25).is_err());
    }
}
