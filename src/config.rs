use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::EngineSpec;
use crate::pipeline::{CameraPolicy, PipelineOptions};

const DEFAULT_LOCAL_PORT: u16 = 8080;
const DEFAULT_DEST_ADDR: &str = "127.0.0.1";
const DEFAULT_DEST_PORT: u16 = 8081;
const DEFAULT_CALIBRATION_DIR: &str = "example-data";
const DEFAULT_MODEL_ROOT: &str = "model";
const DEFAULT_CAMERA_COUNT: usize = 6;
const DEFAULT_INPUT_WIDTH: u32 = 704;
const DEFAULT_INPUT_HEIGHT: u32 = 256;
const DEFAULT_BENCHMARK_ITERATIONS: usize = 5;
const DEFAULT_SYNTHETIC_FRAMES: u64 = 100;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    transport: Option<TransportConfigFile>,
    cameras: Option<CameraConfigFile>,
    engine: Option<EngineConfigFile>,
    replay: Option<bool>,
    benchmark_iterations: Option<usize>,
    synthetic_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TransportConfigFile {
    local_port: Option<u16>,
    dest_addr: Option<String>,
    dest_port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    count: Option<usize>,
    policy: Option<CameraPolicy>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EngineConfigFile {
    model_root: Option<PathBuf>,
    calibration_dir: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub transport: TransportSettings,
    pub cameras: CameraSettings,
    pub engine: EngineSettings,
    /// Rewind the inputs and keep going when they run out.
    pub replay: bool,
    /// Timed inferences in image mode, after the warm-up.
    pub benchmark_iterations: usize,
    /// Frames per camera for `stub://` inputs.
    pub synthetic_frames: u64,
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub local_port: u16,
    pub dest_addr: String,
    pub dest_port: u16,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub count: usize,
    pub policy: CameraPolicy,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model_root: PathBuf,
    pub calibration_dir: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // The empty file has every field defaulted.
        Self::from_file(PipelineConfigFile::default())
    }
}

impl PipelineConfig {
    /// Defaults, then the JSON file named by `BEV_CONFIG`, then `BEV_*`
    /// environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BEV_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let transport = TransportSettings {
            local_port: file
                .transport
                .as_ref()
                .and_then(|t| t.local_port)
                .unwrap_or(DEFAULT_LOCAL_PORT),
            dest_addr: file
                .transport
                .as_ref()
                .and_then(|t| t.dest_addr.clone())
                .unwrap_or_else(|| DEFAULT_DEST_ADDR.to_string()),
            dest_port: file
                .transport
                .as_ref()
                .and_then(|t| t.dest_port)
                .unwrap_or(DEFAULT_DEST_PORT),
        };
        let cameras = CameraSettings {
            count: file
                .cameras
                .as_ref()
                .and_then(|c| c.count)
                .unwrap_or(DEFAULT_CAMERA_COUNT),
            policy: file
                .cameras
                .as_ref()
                .and_then(|c| c.policy)
                .unwrap_or_default(),
        };
        let engine = EngineSettings {
            model_root: file
                .engine
                .as_ref()
                .and_then(|e| e.model_root.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_ROOT)),
            calibration_dir: file
                .engine
                .as_ref()
                .and_then(|e| e.calibration_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CALIBRATION_DIR)),
            input_width: file
                .engine
                .as_ref()
                .and_then(|e| e.input_width)
                .unwrap_or(DEFAULT_INPUT_WIDTH),
            input_height: file
                .engine
                .as_ref()
                .and_then(|e| e.input_height)
                .unwrap_or(DEFAULT_INPUT_HEIGHT),
        };
        Self {
            transport,
            cameras,
            engine,
            replay: file.replay.unwrap_or(false),
            benchmark_iterations: file
                .benchmark_iterations
                .unwrap_or(DEFAULT_BENCHMARK_ITERATIONS),
            synthetic_frames: file.synthetic_frames.unwrap_or(DEFAULT_SYNTHETIC_FRAMES),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("BEV_DEST_ADDR") {
            if !addr.trim().is_empty() {
                self.transport.dest_addr = addr.trim().to_string();
            }
        }
        if let Ok(port) = std::env::var("BEV_DEST_PORT") {
            self.transport.dest_port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("BEV_DEST_PORT must be a port number"))?;
        }
        if let Ok(port) = std::env::var("BEV_LOCAL_PORT") {
            self.transport.local_port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("BEV_LOCAL_PORT must be a port number"))?;
        }
        if let Ok(dir) = std::env::var("BEV_CALIBRATION_DIR") {
            if !dir.trim().is_empty() {
                self.engine.calibration_dir = PathBuf::from(dir);
            }
        }
        if let Ok(policy) = std::env::var("BEV_CAMERA_POLICY") {
            self.cameras.policy = policy.parse()?;
        }
        if let Ok(replay) = std::env::var("BEV_LOOP") {
            self.replay = parse_bool(&replay)
                .ok_or_else(|| anyhow!("BEV_LOOP must be true/false/1/0"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.transport.dest_addr.trim().is_empty() {
            return Err(anyhow!("destination address must not be empty"));
        }
        if self.transport.dest_port == 0 {
            return Err(anyhow!("destination port must be greater than zero"));
        }
        if self.cameras.count == 0 {
            return Err(anyhow!("camera count must be greater than zero"));
        }
        if self.engine.input_width == 0 || self.engine.input_height == 0 {
            return Err(anyhow!("engine input dimensions must be non-zero"));
        }
        if self.benchmark_iterations == 0 {
            return Err(anyhow!("benchmark_iterations must be greater than zero"));
        }
        Ok(())
    }

    pub fn engine_spec(&self, model: &str, precision: &str) -> EngineSpec {
        EngineSpec {
            model: model.to_string(),
            precision: precision.to_string(),
            model_root: self.engine.model_root.clone(),
            cameras: self.cameras.count,
            input_width: self.engine.input_width,
            input_height: self.engine.input_height,
        }
    }

    pub fn pipeline_options(&self, model: &str, precision: &str) -> PipelineOptions {
        PipelineOptions {
            policy: self.cameras.policy,
            local_port: self.transport.local_port,
            dest_addr: self.transport.dest_addr.clone(),
            dest_port: self.transport.dest_port,
            replay: self.replay,
            engine: self.engine_spec(model, precision),
            calibration_dir: self.engine.calibration_dir.clone(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.transport.local_port, 8080);
        assert_eq!(cfg.transport.dest_addr, "127.0.0.1");
        assert_eq!(cfg.transport.dest_port, 8081);
        assert_eq!(cfg.cameras.count, 6);
        assert_eq!(cfg.cameras.policy, CameraPolicy::RequireAll);
        assert_eq!(cfg.engine.calibration_dir, PathBuf::from("example-data"));
        assert_eq!(cfg.engine.model_root, PathBuf::from("model"));
        assert_eq!(cfg.benchmark_iterations, 5);
        assert!(!cfg.replay);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn engine_spec_carries_model_and_geometry() {
        let cfg = PipelineConfig::default();
        let spec = cfg.engine_spec("resnet18", "fp16");
        assert_eq!(spec.model_dir(), PathBuf::from("model").join("resnet18"));
        assert_eq!((spec.input_width, spec.input_height), (704, 256));
        assert_eq!(spec.cameras, 6);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn zero_camera_count_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.cameras.count = 0;
        assert!(cfg.validate().is_err());
    }
}
