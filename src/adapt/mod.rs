//! Frame adapter.
//!
//! Converts decoded camera frames into the RGB24 buffers the perception engine
//! consumes and tracks every allocation so that buffer lifetimes can be
//! audited. Buffers are always owned by a `BufferBatch`; releasing the batch
//! (explicitly or by dropping it) frees them.

mod batch;
mod convert;

pub use batch::{BufferBatch, BufferLedger, LedgerSnapshot, PixelBuffer};

use crate::frame::{FrameSet, RawFrame};

/// Converts frames into engine buffers.
#[derive(Debug, Default)]
pub struct FrameAdapter {
    ledger: BufferLedger,
}

impl FrameAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapt one frame. Returns `None` for an empty or malformed frame so the
    /// caller can drop the whole set instead of failing.
    pub fn adapt(&self, camera: usize, frame: &RawFrame) -> Option<PixelBuffer> {
        if frame.is_empty() {
            log::warn!("camera {}: frame is empty", camera);
            return None;
        }
        match convert::convert_to_rgb(frame.pixels(), frame.width, frame.height, frame.format) {
            Ok(rgb) => Some(PixelBuffer::new(
                rgb,
                frame.width,
                frame.height,
                camera,
                self.ledger.clone(),
            )),
            Err(e) => {
                log::warn!("camera {}: frame not adapted: {}", camera, e);
                None
            }
        }
    }

    /// Adapt every frame of a set into a batch expecting `expected` cameras.
    pub fn adapt_set(&self, set: &FrameSet, expected: usize) -> BufferBatch {
        let mut batch = BufferBatch::new(expected);
        for (camera, frame) in set.frames().iter().enumerate() {
            batch.push(camera, self.adapt(camera, frame));
        }
        batch
    }

    /// Release every buffer of `batch`. Idempotent.
    pub fn release(&self, batch: &mut BufferBatch) -> usize {
        batch.release()
    }

    /// Allocation and release counts since this adapter was created.
    pub fn ledger(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    fn bgr_frame(width: u32, height: u32, fill: u8) -> RawFrame {
        let len = (width * height * 3) as usize;
        RawFrame::new(vec![fill; len], width, height, PixelFormat::Bgr24)
    }

    #[test]
    fn adapt_produces_rgb_buffer_of_expected_size() {
        let adapter = FrameAdapter::new();
        let frame = RawFrame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Bgr24);

        let buffer = adapter.adapt(0, &frame).expect("buffer");
        assert_eq!(buffer.as_bytes(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(
            buffer.as_bytes().len(),
            (buffer.width() * buffer.height() * buffer.channels()) as usize
        );
    }

    #[test]
    fn empty_frame_yields_no_buffer() {
        let adapter = FrameAdapter::new();
        assert!(adapter.adapt(2, &RawFrame::empty()).is_none());
        assert_eq!(adapter.ledger().allocated, 0);
    }

    #[test]
    fn frame_with_wrong_length_yields_no_buffer() {
        let adapter = FrameAdapter::new();
        let short = RawFrame::new(vec![128; 8], 3, 1, PixelFormat::Rgb24);
        let long = RawFrame::new(vec![128; 10], 3, 1, PixelFormat::Bgr24);

        assert!(adapter.adapt(0, &short).is_none());
        assert!(adapter.adapt(1, &long).is_none());
        assert_eq!(adapter.ledger().allocated, 0);
    }

    #[test]
    fn incomplete_batch_tracks_missing_cameras() {
        let adapter = FrameAdapter::new();
        let set = FrameSet::new(
            vec![bgr_frame(4, 4, 1), RawFrame::empty(), bgr_frame(4, 4, 3)],
            0,
        );
        let mut batch = adapter.adapt_set(&set, 3);

        assert!(!batch.is_complete());
        assert_eq!(batch.valid_count(), 2);
        assert_eq!(batch.missing_cameras(), &[1]);

        assert_eq!(adapter.release(&mut batch), 2);
        assert_eq!(adapter.release(&mut batch), 0);
        let ledger = adapter.ledger();
        assert_eq!(ledger.allocated, 2);
        assert_eq!(ledger.released, 2);
    }

    #[test]
    fn batch_with_mixed_dimensions_is_incomplete() {
        let adapter = FrameAdapter::new();
        let set = FrameSet::new(vec![bgr_frame(4, 4, 1), bgr_frame(2, 8, 1)], 0);
        let batch = adapter.adapt_set(&set, 2);
        assert!(!batch.is_complete());
    }

    #[test]
    fn dropping_batch_releases_buffers() {
        let adapter = FrameAdapter::new();
        let set = FrameSet::new(vec![bgr_frame(2, 2, 9), bgr_frame(2, 2, 9)], 0);
        {
            let batch = adapter.adapt_set(&set, 2);
            assert!(batch.is_complete());
            assert_eq!(adapter.ledger().outstanding(), 2);
        }
        assert_eq!(adapter.ledger().outstanding(), 0);
    }
}
