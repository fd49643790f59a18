//! Capture → adapt → infer → broadcast orchestration.
//!
//! A `Pipeline` only exists once startup succeeded: every camera the policy
//! needs is open, the transport socket is bound, the engine is created and
//! calibrated. From there it runs one synchronous cycle per frame set until
//! the source drains, then reports aggregate latency.
//!
//! Buffers adapted in a cycle belong to a `BufferBatch` that is released on
//! every exit path of that cycle.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use serde::Deserialize;
use thiserror::Error;

use crate::adapt::{FrameAdapter, LedgerSnapshot};
use crate::engine::{Calibration, EngineRegistry, EngineSpec, PerceptionEngine};
use crate::frame::FrameSet;
use crate::ingest::{FrameSource, StreamStats};
use crate::stats::{LatencyStats, LatencySummary};
use crate::transport::{BroadcastStats, DetectionBroadcaster};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Running,
    Draining,
    Terminated,
}

/// What to do when fewer cameras open than the deployment expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraPolicy {
    /// Abort startup unless every expected camera opened.
    #[default]
    RequireAll,
    /// Start with at least one camera. Frame sets stay incomplete, so every
    /// cycle is skipped until the configuration is fixed.
    AllowDegraded,
}

impl FromStr for CameraPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require-all" | "require_all" => Ok(Self::RequireAll),
            "allow-degraded" | "allow_degraded" | "degraded" => Ok(Self::AllowDegraded),
            other => Err(anyhow!(
                "unknown camera policy '{}' (expected require-all or allow-degraded)",
                other
            )),
        }
    }
}

impl fmt::Display for CameraPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequireAll => write!(f, "require-all"),
            Self::AllowDegraded => write!(f, "allow-degraded"),
        }
    }
}

/// Startup-fatal conditions. The pipeline never enters `Running` after one.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no camera streams opened")]
    NoCameras,
    #[error("loaded {loaded} cameras, {required} required")]
    MissingCameras { loaded: usize, required: usize },
    #[error("detection transport unavailable: {0:#}")]
    Transport(anyhow::Error),
    #[error("engine failed to load: {0:#}")]
    EngineLoad(anyhow::Error),
    #[error("engine calibration failed: {0:#}")]
    Calibration(anyhow::Error),
}

/// Everything `Pipeline::start` needs besides the frame source.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub policy: CameraPolicy,
    pub local_port: u16,
    pub dest_addr: String,
    pub dest_port: u16,
    /// Rewind the source and keep going when it drains.
    pub replay: bool,
    pub engine: EngineSpec,
    pub calibration_dir: PathBuf,
}

/// Why a cycle did not reach the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    IncompleteBatch { valid: usize, expected: usize },
    InferenceFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { detections: usize, sent: bool },
    Skipped(SkipReason),
    /// The source has no more frame sets or a stop was requested.
    Drained,
}

/// Aggregate report produced by `Pipeline::finish`.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub cycles: u64,
    pub completed: u64,
    pub skipped_incomplete: u64,
    pub inference_failures: u64,
    pub replays: u64,
    pub latency: Option<LatencySummary>,
    pub transport: BroadcastStats,
    /// Frames read per camera, in camera order.
    pub streams: Vec<StreamStats>,
    pub buffers: LedgerSnapshot,
    pub state_history: Vec<PipelineState>,
}

#[derive(Clone, Copy, Debug, Default)]
struct CycleCounters {
    cycles: u64,
    completed: u64,
    skipped_incomplete: u64,
    inference_failures: u64,
    replays: u64,
}

pub struct Pipeline {
    source: FrameSource,
    adapter: FrameAdapter,
    engine: Box<dyn PerceptionEngine>,
    transport: DetectionBroadcaster,
    options: PipelineOptions,
    latency: LatencyStats,
    counters: CycleCounters,
    state: PipelineState,
    history: Vec<PipelineState>,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    /// Bring every component up, in order: cameras, transport, engine,
    /// calibration.
    pub fn start(
        options: PipelineOptions,
        source: FrameSource,
        registry: &EngineRegistry,
    ) -> Result<Self, StartupError> {
        let loaded = source.camera_count();
        let required = options.engine.cameras;
        if loaded == 0 {
            return Err(StartupError::NoCameras);
        }
        if loaded < required {
            match options.policy {
                CameraPolicy::RequireAll => {
                    return Err(StartupError::MissingCameras { loaded, required })
                }
                CameraPolicy::AllowDegraded => log::warn!(
                    "loaded {} cameras, {} required; running degraded, incomplete frame sets are skipped",
                    loaded,
                    required
                ),
            }
        }

        let transport =
            DetectionBroadcaster::configure(options.local_port).map_err(StartupError::Transport)?;

        let mut engine = registry
            .create(&options.engine)
            .map_err(StartupError::EngineLoad)?;

        let calibration =
            Calibration::load(&options.calibration_dir).map_err(StartupError::Calibration)?;
        engine
            .calibrate(&calibration)
            .map_err(StartupError::Calibration)?;
        log::info!(
            "engine {} calibrated from {}",
            engine.name(),
            options.calibration_dir.display()
        );

        Ok(Self {
            source,
            adapter: FrameAdapter::new(),
            engine,
            transport,
            options,
            latency: LatencyStats::new(),
            counters: CycleCounters::default(),
            state: PipelineState::Ready,
            history: vec![PipelineState::Uninitialized, PipelineState::Ready],
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn state_history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Flag checked between cycles; setting it drains the pipeline.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Buffers allocated and released so far.
    pub fn buffer_ledger(&self) -> LedgerSnapshot {
        self.adapter.ledger()
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            log::debug!("pipeline {:?} -> {:?}", self.state, next);
            self.state = next;
            self.history.push(next);
        }
    }

    /// Run one cycle.
    pub fn step(&mut self) -> CycleOutcome {
        match self.state {
            PipelineState::Draining | PipelineState::Terminated => return CycleOutcome::Drained,
            PipelineState::Uninitialized | PipelineState::Ready => {
                self.transition(PipelineState::Running)
            }
            PipelineState::Running => {}
        }

        if self.stop.load(Ordering::SeqCst) {
            log::info!("stop requested");
            self.transition(PipelineState::Draining);
            return CycleOutcome::Drained;
        }

        let Some(set) = self.next_frame_set() else {
            self.transition(PipelineState::Draining);
            return CycleOutcome::Drained;
        };
        self.counters.cycles += 1;

        let expected = self.options.engine.cameras;
        let mut batch = self.adapter.adapt_set(&set, expected);
        drop(set);

        if !batch.is_complete() {
            let valid = batch.valid_count();
            self.adapter.release(&mut batch);
            self.counters.skipped_incomplete += 1;
            log::warn!(
                "skipping frame set: {} of {} camera buffers valid",
                valid,
                expected
            );
            return CycleOutcome::Skipped(SkipReason::IncompleteBatch { valid, expected });
        }

        let started = Instant::now();
        let result = self.engine.infer(batch.buffers());
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(detections) => {
                self.latency.record(elapsed);
                let sent = self.transport.send(
                    &detections,
                    &self.options.dest_addr,
                    self.options.dest_port,
                );
                self.counters.completed += 1;
                CycleOutcome::Completed {
                    detections: detections.len(),
                    sent,
                }
            }
            Err(e) => {
                self.counters.inference_failures += 1;
                log::error!("inference failed, skipping frame set: {:#}", e);
                CycleOutcome::Skipped(SkipReason::InferenceFailed(format!("{:#}", e)))
            }
        };

        self.adapter.release(&mut batch);
        outcome
    }

    fn next_frame_set(&mut self) -> Option<FrameSet> {
        if let Some(set) = self.source.next_frame_set() {
            return Some(set);
        }
        if !self.options.replay || self.source.sets_since_reset() == 0 {
            return None;
        }
        if let Err(e) = self.source.reset() {
            log::error!("replay rewind failed: {:#}", e);
            return None;
        }
        self.counters.replays += 1;
        log::info!("replaying input (pass {})", self.counters.replays + 1);
        self.source.next_frame_set()
    }

    /// Cycle until the source drains or a stop is requested.
    pub fn run(&mut self) {
        while self.step() != CycleOutcome::Drained {}
    }

    /// Release engine and transport and report aggregate statistics.
    pub fn finish(mut self) -> RunSummary {
        self.transition(PipelineState::Draining);
        self.transport.close();
        let transport = self.transport.stats();
        log::info!("releasing {} engine", self.engine.name());
        self.transition(PipelineState::Terminated);

        let Pipeline {
            source,
            adapter,
            engine,
            latency,
            counters,
            history,
            ..
        } = self;
        drop(engine);
        let streams = source.stats();
        drop(source);

        RunSummary {
            cycles: counters.cycles,
            completed: counters.completed,
            skipped_incomplete: counters.skipped_incomplete,
            inference_failures: counters.inference_failures,
            replays: counters.replays,
            latency: latency.summary(),
            transport,
            streams,
            buffers: adapter.ledger(),
            state_history: history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_policy_parses_both_spellings() {
        assert_eq!(
            "require-all".parse::<CameraPolicy>().unwrap(),
            CameraPolicy::RequireAll
        );
        assert_eq!(
            "Allow_Degraded".parse::<CameraPolicy>().unwrap(),
            CameraPolicy::AllowDegraded
        );
        assert!("sometimes".parse::<CameraPolicy>().is_err());
        assert_eq!(CameraPolicy::default(), CameraPolicy::RequireAll);
        assert_eq!(CameraPolicy::AllowDegraded.to_string(), "allow-degraded");
    }

    #[test]
    fn missing_cameras_message_names_the_count() {
        let err = StartupError::MissingCameras {
            loaded: 3,
            required: 6,
        };
        assert_eq!(err.to_string(), "loaded 3 cameras, 6 required");
    }
}
