//! Local file frame source.
//!
//! `FileSource` reads one camera's frames from a local video file. The file
//! source is responsible for:
//! - Decoding video frames in-memory (no network access)
//! - Reporting a clean end of stream instead of an error
//! - Rewinding to the first frame for looped replay
//!
//! `stub://` paths select a synthetic generator so the pipeline can run
//! without a decoder or any media on disk.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{CameraStream, StreamStats};
use crate::frame::{PixelFormat, RawFrame};

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "example-data/CAM_FRONT.mp4") or `stub://<name>`.
    pub path: String,
    /// Frames a synthetic source produces before ending. `None` never ends.
    pub frame_limit: Option<u64>,
    /// Synthetic frame width.
    pub width: u32,
    /// Synthetic frame height.
    pub height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            frame_limit: None,
            width: 704,
            height: 256,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
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
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "video decoding of {} requires the ingest-file-ffmpeg feature",
                    config.path
                ))
            }
        }
    }

    /// Open the underlying file and prepare decoding.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }
}

impl CameraStream for FileSource {
    fn read_frame(&mut self) -> Result<Option<RawFrame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => Ok(source.next_frame()),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => {
                source.rewind();
                Ok(())
            }
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.rewind(),
        }
    }

    fn stats(&self) -> StreamStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    frame_count: u64,
    seed: u8,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Self {
        let seed = config
            .path
            .bytes()
            .fold(0u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b));
        Self {
            config,
            frame_count: 0,
            seed,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: connected to {} (synthetic)", self.config.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Option<RawFrame> {
        if let Some(limit) = self.config.frame_limit {
            if self.frame_count >= limit {
                return None;
            }
        }
        let pixels = self.generate_synthetic_pixels();
        self.frame_count += 1;
        Some(RawFrame::new(
            pixels,
            self.config.width,
            self.config.height,
            PixelFormat::Bgr24,
        ))
    }

    /// A moving gradient; every camera gets its own offset.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.seed as u64) % 256) as u8;
        }
        pixels
    }

    fn rewind(&mut self) {
        self.frame_count = 0;
    }

    fn stats(&self) -> StreamStats {
        StreamStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(frames: u64) -> FileConfig {
        FileConfig {
            path: "stub://CAM_FRONT".to_string(),
            frame_limit: Some(frames),
            width: 8,
            height: 4,
        }
    }

    #[test]
    fn synthetic_source_ends_after_limit() -> Result<()> {
        let mut source = FileSource::new(stub_config(2))?;
        source.connect()?;

        let frame = source.read_frame()?.expect("first frame");
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.format, PixelFormat::Bgr24);
        assert!(source.read_frame()?.is_some());
        assert!(source.read_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn synthetic_source_rewinds() -> Result<()> {
        let mut source = FileSource::new(stub_config(1))?;
        let first = source.read_frame()?.expect("frame");
        assert!(source.read_frame()?.is_none());

        source.rewind()?;
        let replay = source.read_frame()?.expect("frame after rewind");
        assert_eq!(first.pixels(), replay.pixels());
        Ok(())
    }

    #[test]
    fn remote_paths_are_rejected() {
        let config = FileConfig {
            path: "rtsp://camera/stream".to_string(),
            ..FileConfig::default()
        };
        assert!(FileSource::new(config).is_err());
    }
}
