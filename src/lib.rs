//! Surround-camera perception relay.
//!
//! Pulls one synchronized frame set per cycle from a fixed rig of cameras,
//! adapts every frame into the RGB buffers a perception engine consumes, runs
//! the engine once per set and broadcasts the detections as a single UDP
//! datagram.
//!
//! # Cycle
//!
//! 1. `ingest::FrameSource` reads one frame from every open camera, or
//!    reports the end of the stream. Partial sets are never returned.
//! 2. `adapt::FrameAdapter` converts the set into a `BufferBatch`. A batch
//!    with a missing camera skips the cycle.
//! 3. The `engine::PerceptionEngine` runs on the batch; its latency is
//!    recorded.
//! 4. `transport::DetectionBroadcaster` sends the detections, fire and forget.
//! 5. The batch is released, whatever happened above.
//!
//! # Module Structure
//!
//! - `frame`: decoded frames and frame sets
//! - `ingest`: camera streams, the lock-step frame source, still images
//! - `adapt`: channel conversion and scoped buffer ownership
//! - `engine`: the engine boundary, calibration, built-in engines
//! - `transport`: wire format and UDP broadcaster
//! - `pipeline`: startup, state machine and cycle loop
//! - `bench`: still-image benchmark
//! - `config`, `cli`: configuration file, environment and command line

pub mod adapt;
pub mod bench;
pub mod cli;
pub mod config;
pub mod engine;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod results;
pub mod stats;
pub mod transport;

pub use adapt::{BufferBatch, FrameAdapter, LedgerSnapshot, PixelBuffer};
pub use config::PipelineConfig;
pub use engine::{
    BoxSize, Calibration, Detection, EngineRegistry, EngineSpec, PerceptionEngine, Position,
    StubEngine, Velocity,
};
pub use frame::{FrameSet, PixelFormat, RawFrame};
pub use ingest::{CameraLayout, CameraStream, FrameSource, StreamStats};
pub use pipeline::{
    CameraPolicy, CycleOutcome, Pipeline, PipelineOptions, PipelineState, RunSummary, SkipReason,
    StartupError,
};
pub use stats::{LatencyStats, LatencySummary};
pub use transport::{decode_detections, encode_detections, DetectionBroadcaster};
