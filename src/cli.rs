//! Command-line surface of `bevd`.

use clap::Parser;

use crate::config::PipelineConfig;
use crate::pipeline::CameraPolicy;

pub const DEFAULT_INPUT: &str = "example-data";
pub const DEFAULT_MODEL: &str = "resnet18";
pub const DEFAULT_PRECISION: &str = "fp16";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// One frame set from still images, benchmarked.
    Image,
    /// Synchronized video streams, broadcast per frame set.
    Video,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bevd",
    author,
    version,
    about = "Surround-camera perception relay: capture, infer, broadcast detections over UDP"
)]
pub struct Cli {
    /// Input directory (camera videos with --video, still images otherwise).
    /// When given more than once, the last one wins. `stub://` selects
    /// synthetic cameras in video mode.
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Stream synchronized camera videos instead of benchmarking still images.
    #[arg(short = 'v', long)]
    pub video: bool,

    /// Model name, resolved under the model root.
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Engine precision label.
    #[arg(short, long, default_value = DEFAULT_PRECISION)]
    pub precision: String,

    /// Rewind the videos and keep going when they end.
    #[arg(long = "loop")]
    pub replay: bool,

    /// Start even when some camera videos are missing.
    #[arg(long)]
    pub allow_degraded: bool,

    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    pub ui: String,
}

impl Cli {
    pub fn input(&self) -> &str {
        self.inputs
            .last()
            .map(String::as_str)
            .unwrap_or(DEFAULT_INPUT)
    }

    pub fn mode(&self) -> RunMode {
        if self.video {
            RunMode::Video
        } else {
            RunMode::Image
        }
    }

    /// Fold command-line switches into the loaded configuration. Switches
    /// only ever enable behaviour; absent switches leave the config alone.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if self.replay {
            config.replay = true;
        }
        if self.allow_degraded {
            config.cameras.policy = CameraPolicy::AllowDegraded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_image_mode() {
        let cli = Cli::parse_from(["bevd"]);
        assert_eq!(cli.input(), "example-data");
        assert_eq!(cli.model, "resnet18");
        assert_eq!(cli.precision, "fp16");
        assert_eq!(cli.mode(), RunMode::Image);
    }

    #[test]
    fn last_positional_wins() {
        let cli = Cli::parse_from(["bevd", "first", "-v", "second", "-m", "resnet34"]);
        assert_eq!(cli.input(), "second");
        assert_eq!(cli.mode(), RunMode::Video);
        assert_eq!(cli.model, "resnet34");
    }

    #[test]
    fn switches_override_config() {
        let cli = Cli::parse_from(["bevd", "--video", "--loop", "--allow-degraded", "-p", "int8"]);
        let mut cfg = PipelineConfig::default();
        cli.apply_to(&mut cfg);
        assert!(cfg.replay);
        assert_eq!(cfg.cameras.policy, CameraPolicy::AllowDegraded);
        assert_eq!(cli.precision, "int8");
    }

    #[test]
    fn absent_switches_keep_config() {
        let cli = Cli::parse_from(["bevd", "data"]);
        let mut cfg = PipelineConfig::default();
        cfg.replay = true;
        cli.apply_to(&mut cfg);
        assert!(cfg.replay);
        assert_eq!(cfg.cameras.policy, CameraPolicy::RequireAll);
    }
}
