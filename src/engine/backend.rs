use std::path::PathBuf;

use anyhow::Result;

use crate::adapt::PixelBuffer;

use super::calibration::Calibration;
use super::detection::Detection;

/// Parameters an engine is created from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSpec {
    /// Model name, e.g. "resnet18".
    pub model: String,
    /// Precision label, e.g. "fp16". Interpreted by the engine.
    pub precision: String,
    /// Directory holding one subdirectory per model.
    pub model_root: PathBuf,
    /// Cameras per frame set.
    pub cameras: usize,
    /// Frame width the engine expects.
    pub input_width: u32,
    /// Frame height the engine expects.
    pub input_height: u32,
}

impl EngineSpec {
    /// `<model_root>/<model>`.
    pub fn model_dir(&self) -> PathBuf {
        self.model_root.join(&self.model)
    }
}

/// Perception engine boundary.
///
/// The pipeline holds one engine for its whole lifetime, pushes calibration
/// into it once, then calls `infer` once per complete frame set. Buffers are
/// borrowed for the duration of the call only.
pub trait PerceptionEngine: Send {
    /// Engine identifier.
    fn name(&self) -> &'static str;

    /// Load the camera/volume calibration tensors.
    fn calibrate(&mut self, calibration: &Calibration) -> Result<()>;

    /// Run inference on one frame set, one buffer per camera in camera order.
    ///
    /// Errors are per-call; the engine must remain usable afterwards.
    fn infer(&mut self, buffers: &[PixelBuffer]) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
