use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::adapt::PixelBuffer;
use crate::engine::backend::PerceptionEngine;
use crate::engine::calibration::Calibration;
use crate::engine::detection::{BoxSize, Detection, Position, Velocity};

/// Stub engine for testing and hardware-free runs.
///
/// Emits one detection per camera, derived from a SHA-256 digest of that
/// camera's pixels, so identical frame sets always yield identical output.
pub struct StubEngine {
    cameras: usize,
    calibrated: bool,
    calls: u64,
}

impl StubEngine {
    pub fn new(cameras: usize) -> Self {
        Self {
            cameras,
            calibrated: false,
            calls: 0,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl PerceptionEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn calibrate(&mut self, calibration: &Calibration) -> Result<()> {
        if !calibration.is_complete() {
            return Err(anyhow!("stub engine requires a complete calibration set"));
        }
        self.calibrated = true;
        Ok(())
    }

    fn infer(&mut self, buffers: &[PixelBuffer]) -> Result<Vec<Detection>> {
        if !self.calibrated {
            return Err(anyhow!("stub engine used before calibration"));
        }
        if buffers.len() != self.cameras {
            return Err(anyhow!(
                "expected {} camera buffers, received {}",
                self.cameras,
                buffers.len()
            ));
        }
        self.calls += 1;
        Ok(buffers
            .iter()
            .map(|buffer| detection_from_digest(&Sha256::digest(buffer.as_bytes()).into()))
            .collect())
    }
}

fn detection_from_digest(d: &[u8; 32]) -> Detection {
    let unit = |b: u8| b as f32 / 255.0;
    Detection {
        position: Position {
            x: (d[0] as f32 - 128.0) / 4.0,
            y: (d[1] as f32 - 128.0) / 4.0,
            z: unit(d[2]) * 2.0 - 1.0,
        },
        size: BoxSize {
            width: 0.5 + unit(d[3]) * 2.0,
            length: 0.5 + unit(d[4]) * 4.0,
            height: 0.5 + unit(d[5]) * 2.0,
        },
        velocity: Velocity::default(),
        heading: unit(d[6]) * std::f32::consts::TAU - std::f32::consts::PI,
        class_id: (d[7] % 10) as i32,
        confidence: unit(d[8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::BufferLedger;
    use crate::engine::calibration::{CalibrationTensor, CALIBRATION_TENSORS};

    fn calibration() -> Calibration {
        Calibration::from_tensors(
            CALIBRATION_TENSORS
                .iter()
                .map(|name| CalibrationTensor {
                    name: name.to_string(),
                    path: format!("{}.tensor", name).into(),
                    bytes: vec![1],
                })
                .collect(),
        )
    }

    fn buffers(count: usize, fill: u8, ledger: &BufferLedger) -> Vec<PixelBuffer> {
        (0..count)
            .map(|camera| PixelBuffer::new(vec![fill; 12], 2, 2, camera, ledger.clone()))
            .collect()
    }

    #[test]
    fn infer_requires_calibration() {
        let ledger = BufferLedger::new();
        let mut engine = StubEngine::new(2);
        assert!(engine.infer(&buffers(2, 0, &ledger)).is_err());
    }

    #[test]
    fn incomplete_calibration_is_rejected() {
        let mut engine = StubEngine::new(2);
        assert!(engine.calibrate(&Calibration::default()).is_err());
    }

    #[test]
    fn output_is_deterministic() -> Result<()> {
        let ledger = BufferLedger::new();
        let mut engine = StubEngine::new(3);
        engine.calibrate(&calibration())?;

        let first = engine.infer(&buffers(3, 7, &ledger))?;
        let second = engine.infer(&buffers(3, 7, &ledger))?;
        let other = engine.infer(&buffers(3, 8, &ledger))?;

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.iter().all(|d| (0.0..=1.0).contains(&d.confidence)));
        assert_eq!(engine.calls(), 3);
        Ok(())
    }

    #[test]
    fn camera_count_mismatch_is_an_error() -> Result<()> {
        let ledger = BufferLedger::new();
        let mut engine = StubEngine::new(6);
        engine.calibrate(&calibration())?;
        assert!(engine.infer(&buffers(5, 0, &ledger)).is_err());
        Ok(())
    }
}
