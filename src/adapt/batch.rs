use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Allocation accounting shared by an adapter and every buffer it hands out.
#[derive(Clone, Debug, Default)]
pub struct BufferLedger {
    counts: Arc<LedgerCounts>,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    allocated: AtomicU64,
    released: AtomicU64,
}

/// Point-in-time view of a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub allocated: u64,
    pub released: u64,
}

impl LedgerSnapshot {
    /// Buffers handed out and not yet released.
    pub fn outstanding(&self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            allocated: self.counts.allocated.load(Ordering::Relaxed),
            released: self.counts.released.load(Ordering::Relaxed),
        }
    }

    fn record_alloc(&self) {
        self.counts.allocated.fetch_add(1, Ordering::Relaxed);
    }

    fn record_release(&self) {
        self.counts.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Adapted RGB24 image for one camera: row-major, no padding.
///
/// Not `Clone`: a buffer has exactly one owner and is released exactly once,
/// when that owner drops it.
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    camera: usize,
    ledger: BufferLedger,
}

impl PixelBuffer {
    pub(crate) fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        camera: usize,
        ledger: BufferLedger,
    ) -> Self {
        ledger.record_alloc();
        Self {
            data,
            width,
            height,
            camera,
            ledger,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        3
    }

    /// Index of the camera this buffer was adapted from.
    pub fn camera(&self) -> usize {
        self.camera
    }
}

impl Drop for PixelBuffer {
    fn drop(&mut self) {
        self.ledger.record_release();
    }
}

/// Scoped owner of the buffers adapted from one frame set.
///
/// The batch holds its buffers from adaptation until `release`, which runs
/// either explicitly or on drop, so every exit path of a cycle frees them.
pub struct BufferBatch {
    buffers: Vec<PixelBuffer>,
    missing: Vec<usize>,
    expected: usize,
}

impl BufferBatch {
    pub(crate) fn new(expected: usize) -> Self {
        Self {
            buffers: Vec::with_capacity(expected),
            missing: Vec::new(),
            expected,
        }
    }

    pub(crate) fn push(&mut self, camera: usize, buffer: Option<PixelBuffer>) {
        match buffer {
            Some(buffer) => self.buffers.push(buffer),
            None => self.missing.push(camera),
        }
    }

    /// Adapted buffers in camera order.
    pub fn buffers(&self) -> &[PixelBuffer] {
        &self.buffers
    }

    /// Number of non-null buffers held.
    pub fn valid_count(&self) -> usize {
        self.buffers.len()
    }

    /// Cameras whose frame was absent or unusable.
    pub fn missing_cameras(&self) -> &[usize] {
        &self.missing
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// True when the batch holds one buffer per expected camera and all share
    /// the same dimensions.
    pub fn is_complete(&self) -> bool {
        if !self.missing.is_empty() || self.buffers.len() != self.expected {
            return false;
        }
        let Some(first) = self.buffers.first() else {
            return false;
        };
        self.buffers
            .iter()
            .all(|b| b.width == first.width && b.height == first.height)
    }

    /// Free every held buffer. Returns how many were freed; a second call
    /// frees nothing.
    pub fn release(&mut self) -> usize {
        let released = self.buffers.len();
        self.buffers.clear();
        self.missing.clear();
        released
    }
}

impl Drop for BufferBatch {
    fn drop(&mut self) {
        self.release();
    }
}
