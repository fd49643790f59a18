//! Synchronized multi-camera frame source.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::file::{FileConfig, FileSource};
use super::{CameraStream, StreamStats, CAMERA_NAMES, VIDEO_EXTENSIONS};
use crate::frame::{FrameSet, RawFrame};

/// Logical camera names, in engine order, and the file extensions probed for
/// each of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraLayout {
    pub names: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for CameraLayout {
    fn default() -> Self {
        Self {
            names: CAMERA_NAMES.iter().map(|s| s.to_string()).collect(),
            extensions: VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CameraLayout {
    /// Number of cameras a complete frame set holds.
    pub fn camera_count(&self) -> usize {
        self.names.len()
    }

    /// First existing `<dir>/<camera><ext>` over the configured extensions.
    pub fn locate(&self, dir: &Path, camera: &str) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("{}{}", camera, ext)))
            .find(|candidate| candidate.is_file())
    }
}

struct CameraHandle {
    name: String,
    stream: Box<dyn CameraStream>,
}

/// Owns one stream per opened camera and reads them in lock step.
pub struct FrameSource {
    cameras: Vec<CameraHandle>,
    expected: usize,
    sets_read: u64,
    sets_since_reset: u64,
    exhausted: bool,
}

impl FrameSource {
    /// Open every camera of `layout` found under `dir` as a video file.
    ///
    /// Cameras without a file, or whose file cannot be opened, are skipped
    /// with a warning. Check `camera_count()` to decide whether to proceed.
    pub fn open(dir: impl AsRef<Path>, layout: &CameraLayout) -> Self {
        Self::open_with(dir, layout, |_, path| {
            let mut source = FileSource::new(FileConfig {
                path: path.to_string_lossy().into_owned(),
                ..FileConfig::default()
            })?;
            source.connect()?;
            Ok(Box::new(source) as Box<dyn CameraStream>)
        })
    }

    /// Like `open`, with a caller-supplied opener for located files.
    pub fn open_with<F>(dir: impl AsRef<Path>, layout: &CameraLayout, mut opener: F) -> Self
    where
        F: FnMut(&str, &Path) -> Result<Box<dyn CameraStream>>,
    {
        let dir = dir.as_ref();
        let mut source = Self::from_streams(Vec::new(), layout.camera_count());

        for name in &layout.names {
            let Some(path) = layout.locate(dir, name) else {
                log::warn!("could not find video file for camera {}", name);
                continue;
            };
            match opener(name, &path) {
                Ok(stream) => {
                    log::info!("loaded video {}", path.display());
                    source.cameras.push(CameraHandle {
                        name: name.clone(),
                        stream,
                    });
                }
                Err(e) => log::warn!("error opening video {}: {:#}", path.display(), e),
            }
        }

        if source.camera_count() != source.expected {
            log::warn!(
                "expected {} cameras, but loaded {}",
                source.expected,
                source.camera_count()
            );
        }
        source
    }

    /// Synthetic `stub://` streams for every camera of `layout`.
    pub fn synthetic(layout: &CameraLayout, frames: Option<u64>, width: u32, height: u32) -> Self {
        let streams = layout
            .names
            .iter()
            .filter_map(|name| {
                let config = FileConfig {
                    path: format!("stub://{}", name),
                    frame_limit: frames,
                    width,
                    height,
                };
                match FileSource::new(config) {
                    Ok(source) => Some((name.clone(), Box::new(source) as Box<dyn CameraStream>)),
                    Err(e) => {
                        log::warn!("synthetic camera {}: {:#}", name, e);
                        None
                    }
                }
            })
            .collect();
        Self::from_streams(streams, layout.camera_count())
    }

    /// Wrap already-open streams, in camera order.
    pub fn from_streams(streams: Vec<(String, Box<dyn CameraStream>)>, expected: usize) -> Self {
        Self {
            cameras: streams
                .into_iter()
                .map(|(name, stream)| CameraHandle { name, stream })
                .collect(),
            expected,
            sets_read: 0,
            sets_since_reset: 0,
            exhausted: false,
        }
    }

    /// Number of streams successfully opened.
    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Number of cameras the deployment is configured for.
    pub fn expected_count(&self) -> usize {
        self.expected
    }

    pub fn camera_names(&self) -> Vec<&str> {
        self.cameras.iter().map(|c| c.name.as_str()).collect()
    }

    /// Frame sets produced since the last `reset`.
    pub fn sets_since_reset(&self) -> u64 {
        self.sets_since_reset
    }

    /// Read one frame from every open stream.
    ///
    /// Returns `None` once any stream ends, fails, or the streams disagree on
    /// frame dimensions; stays `None` until `reset`.
    pub fn next_frame_set(&mut self) -> Option<FrameSet> {
        if self.exhausted || self.cameras.is_empty() {
            return None;
        }

        let mut frames: Vec<RawFrame> = Vec::with_capacity(self.cameras.len());
        for camera in &mut self.cameras {
            match camera.stream.read_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {
                    log::info!("camera {}: end of stream", camera.name);
                    self.exhausted = true;
                    return None;
                }
                Err(e) => {
                    log::error!("camera {}: read failed: {:#}", camera.name, e);
                    self.exhausted = true;
                    return None;
                }
            }
        }

        let set = FrameSet::new(frames, self.sets_read);
        if !set.is_uniform() {
            log::error!(
                "frame set {} mixes frame dimensions across cameras",
                set.sequence()
            );
            self.exhausted = true;
            return None;
        }

        self.sets_read += 1;
        self.sets_since_reset += 1;
        Some(set)
    }

    /// Rewind every stream to its first frame.
    pub fn reset(&mut self) -> Result<()> {
        for camera in &mut self.cameras {
            camera.stream.rewind()?;
        }
        self.exhausted = false;
        self.sets_since_reset = 0;
        Ok(())
    }

    pub fn stats(&self) -> Vec<StreamStats> {
        self.cameras.iter().map(|c| c.stream.stats()).collect()
    }
}
