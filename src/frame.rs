//! Decoded camera frames and synchronized frame sets.
//!
//! - `RawFrame`: one decoded image as handed over by a camera stream, in the
//!   stream's native channel order.
//! - `FrameSet`: one frame per open camera, all read in the same cycle.
//!
//! Frames never leave the process. They are converted into engine buffers by
//! the adapter and dropped at the end of the cycle that read them.

/// Channel layout of a decoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit blue, green, red. What most capture stacks deliver.
    Bgr24,
    /// Packed 8-bit red, green, blue.
    Rgb24,
}

impl PixelFormat {
    /// Number of bytes a tightly packed frame of this format occupies.
    pub fn frame_len(self, width: u32, height: u32) -> Option<usize> {
        match self {
            PixelFormat::Bgr24 | PixelFormat::Rgb24 => (width as usize)
                .checked_mul(height as usize)?
                .checked_mul(3),
        }
    }
}

/// One decoded camera frame.
///
/// A frame with no pixel data models a decoder that reported success but
/// produced nothing; the adapter treats it as a missing camera.
pub struct RawFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// A frame without pixels.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, PixelFormat::Bgr24)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }
}

/// Frames from every open camera for one read cycle, in camera order.
pub struct FrameSet {
    frames: Vec<RawFrame>,
    sequence: u64,
}

impl FrameSet {
    pub fn new(frames: Vec<RawFrame>, sequence: u64) -> Self {
        Self { frames, sequence }
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    /// Zero-based index of the read cycle that produced this set.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True when every frame shares the first frame's dimensions.
    pub fn is_uniform(&self) -> bool {
        let Some(first) = self.frames.first() else {
            return true;
        };
        self.frames
            .iter()
            .all(|f| f.width == first.width && f.height == first.height)
    }
}
