//! Frame ingestion.
//!
//! This module provides the sources frames are read from:
//! - Local video files, one per camera (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` streams (testing, dry runs)
//! - Still images for the single-shot benchmark mode
//!
//! `FrameSource` owns one `CameraStream` per camera and reads them in lock
//! step, producing one `FrameSet` per cycle. The ingestion layer is
//! responsible for:
//! - Locating each camera's stream by name and extension
//! - Skipping cameras that cannot be opened (with a warning)
//! - Never returning a partial frame set

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod source;
pub mod still;

use anyhow::Result;

use crate::frame::RawFrame;

pub use file::{FileConfig, FileSource};
pub use source::{CameraLayout, FrameSource};

/// Camera order expected by the perception engine.
pub const CAMERA_NAMES: [&str; 6] = [
    "CAM_FRONT",
    "CAM_FRONT_RIGHT",
    "CAM_FRONT_LEFT",
    "CAM_BACK",
    "CAM_BACK_LEFT",
    "CAM_BACK_RIGHT",
];

/// Extensions probed, in order, when looking for a camera's video file.
pub const VIDEO_EXTENSIONS: [&str; 3] = [".mp4", ".avi", ".mov"];

/// One camera's capture handle.
pub trait CameraStream {
    /// Read the next frame. `Ok(None)` is a clean end of stream.
    fn read_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Seek back to the first frame.
    fn rewind(&mut self) -> Result<()>;

    /// Frame statistics.
    fn stats(&self) -> StreamStats;
}

/// Statistics for a camera stream.
#[derive(Clone, Debug)]
pub struct StreamStats {
    pub frames_captured: u64,
    pub path: String,
}
