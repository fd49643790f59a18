#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::adapt::PixelBuffer;
use crate::engine::backend::{EngineSpec, PerceptionEngine};
use crate::engine::calibration::Calibration;
use crate::engine::detection::{BoxSize, Detection, Position, Velocity};

/// Per-channel normalization, RGB order.
const MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const STD: [f32; 3] = [58.395, 57.12, 57.375];

/// Nearest-neighbour scale and crop from a camera frame onto the model input.
///
/// The frame is scaled until it covers the input, then cropped: centred
/// horizontally, aligned to the bottom edge. A 1600x900 frame onto 704x256
/// scales by 0.44 and drops the top 140 rows.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ResizeCrop {
    scale: f32,
    offset_x: u32,
    offset_y: u32,
    src_width: u32,
    src_height: u32,
}

impl ResizeCrop {
    fn new(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> Self {
        let src_width = src_width.max(1);
        let src_height = src_height.max(1);
        let scale = (dst_width as f32 / src_width as f32).max(dst_height as f32 / src_height as f32);
        let scaled_width = (src_width as f32 * scale).round() as u32;
        let scaled_height = (src_height as f32 * scale).round() as u32;
        Self {
            scale,
            offset_x: scaled_width.saturating_sub(dst_width) / 2,
            offset_y: scaled_height.saturating_sub(dst_height),
            src_width,
            src_height,
        }
    }

    /// Pixel index in the source frame for model input pixel `(x, y)`.
    fn source_index(&self, x: usize, y: usize) -> usize {
        let sx = ((x as f32 + self.offset_x as f32) / self.scale) as u32;
        let sy = ((y as f32 + self.offset_y as f32) / self.scale) as u32;
        let sx = sx.min(self.src_width - 1) as usize;
        let sy = sy.min(self.src_height - 1) as usize;
        sy * self.src_width as usize + sx
    }
}

/// Tract-based engine for ONNX surround-view models.
///
/// Input is `[cameras, 3, height, width]` f32, normalized with `MEAN`/`STD`.
/// Camera frames of any size are scaled and cropped onto the input.
/// Output rows are `x y z w l h heading class score` (9 columns) or
/// `x y z w l h vx vy heading class score` (11 columns).
pub struct TractEngine {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    cameras: usize,
    width: u32,
    height: u32,
    calibration: Option<Calibration>,
}

impl TractEngine {
    /// Load `<model_root>/<model>/<model>.onnx`.
    pub fn from_spec(spec: &EngineSpec) -> Result<Self> {
        let path = spec.model_dir().join(format!("{}.onnx", spec.model));
        if spec.precision != "fp32" {
            log::info!(
                "tract runs f32; precision '{}' accepted as a label only",
                spec.precision
            );
        }
        Self::new(&path, spec.cameras, spec.input_width, spec.input_height)
    }

    pub fn new<P: AsRef<Path>>(model_path: P, cameras: usize, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(cameras, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            cameras,
            width,
            height,
            calibration: None,
        })
    }

    fn build_input(&self, buffers: &[PixelBuffer]) -> Result<Tensor> {
        if buffers.len() != self.cameras {
            return Err(anyhow!(
                "expected {} camera buffers, received {}",
                self.cameras,
                buffers.len()
            ));
        }
        let crops: Vec<ResizeCrop> = buffers
            .iter()
            .map(|b| ResizeCrop::new(b.width(), b.height(), self.width, self.height))
            .collect();

        let input = tract_ndarray::Array4::from_shape_fn(
            (self.cameras, 3, self.height as usize, self.width as usize),
            |(camera, channel, y, x)| {
                let idx = crops[camera].source_index(x, y) * 3 + channel;
                let value = buffers[camera].as_bytes()[idx] as f32;
                (value - MEAN[channel]) / STD[channel]
            },
        );

        Ok(input.into_tensor())
    }
}

fn decode_outputs(outputs: TVec<TValue>) -> Result<Vec<Detection>> {
    let output = outputs
        .first()
        .ok_or_else(|| anyhow!("model produced no outputs"))?;
    let view = output
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    let shape = view.shape();
    let columns = *shape.last().ok_or_else(|| anyhow!("model output is a scalar"))?;
    if columns != 9 && columns != 11 {
        return Err(anyhow!("unsupported detection row width {}", columns));
    }

    let values: Vec<f32> = view.iter().copied().collect();
    Ok(values
        .chunks_exact(columns)
        .map(|row| decode_row(row, columns))
        .collect())
}

fn decode_row(row: &[f32], columns: usize) -> Detection {
    let (velocity, rest) = if columns == 11 {
        (
            Velocity {
                vx: row[6],
                vy: row[7],
            },
            &row[8..],
        )
    } else {
        (Velocity::default(), &row[6..])
    };
    Detection {
        position: Position {
            x: row[0],
            y: row[1],
            z: row[2],
        },
        size: BoxSize {
            width: row[3],
            length: row[4],
            height: row[5],
        },
        velocity,
        heading: rest[0],
        class_id: rest[1] as i32,
        confidence: rest[2],
    }
}

impl PerceptionEngine for TractEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn calibrate(&mut self, calibration: &Calibration) -> Result<()> {
        if !calibration.is_complete() {
            return Err(anyhow!("tract engine requires a complete calibration set"));
        }
        log::debug!(
            "tract engine holding {} bytes of calibration",
            calibration.total_bytes()
        );
        self.calibration = Some(calibration.clone());
        Ok(())
    }

    fn infer(&mut self, buffers: &[PixelBuffer]) -> Result<Vec<Detection>> {
        if self.calibration.is_none() {
            return Err(anyhow!("tract engine used before calibration"));
        }
        let input = self.build_input(buffers)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        decode_outputs(outputs)
    }
}
