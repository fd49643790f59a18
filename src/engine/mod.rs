//! Perception engine boundary.
//!
//! The pipeline never looks inside an engine: it creates one through the
//! registry, pushes calibration into it once and calls `infer` per frame set.

mod backend;
mod backends;
mod calibration;
mod detection;
mod registry;

pub use backend::{EngineSpec, PerceptionEngine};
pub use backends::StubEngine;
#[cfg(feature = "backend-tract")]
pub use backends::TractEngine;
pub use calibration::{Calibration, CalibrationTensor, CALIBRATION_TENSORS};
pub use detection::{BoxSize, Detection, Position, Velocity};
pub use registry::{EngineFactory, EngineRegistry};
