//! Calibration tensors pushed into the engine at startup.
//!
//! The byte layout of each tensor belongs to the engine; this layer only
//! locates, reads and hands them over.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Tensor names, loaded from `<dir>/<name>.tensor`.
pub const CALIBRATION_TENSORS: [&str; 3] = ["valid_c_idx", "x", "y"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalibrationTensor {
    pub name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// The full calibration set, in `CALIBRATION_TENSORS` order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Calibration {
    tensors: Vec<CalibrationTensor>,
}

impl Calibration {
    /// Read every calibration tensor from `dir`. All three must exist and be
    /// non-empty.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut tensors = Vec::with_capacity(CALIBRATION_TENSORS.len());
        for name in CALIBRATION_TENSORS {
            let path = dir.join(format!("{}.tensor", name));
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read calibration tensor {}", path.display()))?;
            if bytes.is_empty() {
                return Err(anyhow!("calibration tensor {} is empty", path.display()));
            }
            tensors.push(CalibrationTensor {
                name: name.to_string(),
                path,
                bytes,
            });
        }
        Ok(Self { tensors })
    }

    pub fn from_tensors(tensors: Vec<CalibrationTensor>) -> Self {
        Self { tensors }
    }

    pub fn get(&self, name: &str) -> Option<&CalibrationTensor> {
        self.tensors.iter().find(|t| t.name == name)
    }

    pub fn tensors(&self) -> &[CalibrationTensor] {
        &self.tensors
    }

    /// True when every named tensor is present.
    pub fn is_complete(&self) -> bool {
        CALIBRATION_TENSORS
            .iter()
            .all(|name| self.get(name).is_some())
    }

    pub fn total_bytes(&self) -> usize {
        self.tensors.iter().map(|t| t.bytes.len()).sum()
    }
}
