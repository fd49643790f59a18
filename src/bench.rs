//! Single-shot benchmark over one still-image frame set.

use std::time::Instant;

use anyhow::{anyhow, Context, Result};

use crate::adapt::{FrameAdapter, LedgerSnapshot};
use crate::engine::{Detection, PerceptionEngine};
use crate::frame::FrameSet;
use crate::stats::{LatencyStats, LatencySummary};

#[derive(Clone, Debug)]
pub struct BenchmarkReport {
    /// Detections from the warm-up inference.
    pub detections: Vec<Detection>,
    /// Timed iterations only; the warm-up is excluded.
    pub latency: Option<LatencySummary>,
    pub buffers: LedgerSnapshot,
}

/// Adapt `set` once, run one warm-up inference and `iterations` timed ones.
///
/// Unlike the streaming loop, an incomplete set or a failed inference is an
/// error here: there is only one frame set to work with.
pub fn run_benchmark(
    engine: &mut dyn PerceptionEngine,
    set: &FrameSet,
    cameras: usize,
    iterations: usize,
) -> Result<BenchmarkReport> {
    let adapter = FrameAdapter::new();
    let mut batch = adapter.adapt_set(set, cameras);
    if !batch.is_complete() {
        let missing = batch.missing_cameras().to_vec();
        adapter.release(&mut batch);
        return Err(anyhow!(
            "frame set incomplete: {} of {} images usable (missing cameras {:?})",
            set.len() - missing.len(),
            cameras,
            missing
        ));
    }

    engine.warm_up()?;
    let detections = engine
        .infer(batch.buffers())
        .context("warm-up inference failed")?;

    let mut latency = LatencyStats::new();
    for iteration in 0..iterations {
        let started = Instant::now();
        engine
            .infer(batch.buffers())
            .with_context(|| format!("timed inference {} failed", iteration + 1))?;
        latency.record(started.elapsed());
    }

    adapter.release(&mut batch);
    Ok(BenchmarkReport {
        detections,
        latency: latency.summary(),
        buffers: adapter.ledger(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Calibration, CalibrationTensor, StubEngine, CALIBRATION_TENSORS};
    use crate::frame::{PixelFormat, RawFrame};

    fn calibrated_stub(cameras: usize) -> StubEngine {
        let mut engine = StubEngine::new(cameras);
        let tensors = CALIBRATION_TENSORS
            .iter()
            .map(|name| CalibrationTensor {
                name: name.to_string(),
                path: format!("{}.tensor", name).into(),
                bytes: vec![0, 1],
            })
            .collect();
        engine
            .calibrate(&Calibration::from_tensors(tensors))
            .unwrap();
        engine
    }

    fn rgb_set(cameras: usize) -> FrameSet {
        let frames = (0..cameras)
            .map(|i| RawFrame::new(vec![i as u8; 4 * 2 * 3], 4, 2, PixelFormat::Rgb24))
            .collect();
        FrameSet::new(frames, 0)
    }

    #[test]
    fn warm_up_plus_timed_iterations() -> Result<()> {
        let mut engine = calibrated_stub(3);
        let report = run_benchmark(&mut engine, &rgb_set(3), 3, 5)?;

        assert_eq!(report.detections.len(), 3);
        assert_eq!(report.latency.map(|l| l.count), Some(5));
        assert_eq!(engine.calls(), 6);
        assert_eq!(report.buffers.allocated, 3);
        assert_eq!(report.buffers.outstanding(), 0);
        Ok(())
    }

    #[test]
    fn incomplete_set_is_an_error_and_releases_buffers() {
        let mut engine = calibrated_stub(3);
        let set = FrameSet::new(
            vec![
                RawFrame::new(vec![1; 24], 4, 2, PixelFormat::Rgb24),
                RawFrame::new(vec![2; 24], 4, 2, PixelFormat::Rgb24),
                RawFrame::empty(),
            ],
            0,
        );

        let err = run_benchmark(&mut engine, &set, 3, 5).unwrap_err();
        assert!(err.to_string().contains("2 of 3 images usable"));
        assert_eq!(engine.calls(), 0);
    }
}
