//! bevd - surround-camera perception relay.
//!
//! Two modes:
//! - image (default): load one still image per camera from the input
//!   directory, run a warm-up inference plus a timed benchmark and save the
//!   warm-up detections under the model directory.
//! - video (`--video`): open one video per camera, then capture, infer and
//!   broadcast detections over UDP until the videos end (or forever with
//!   `--loop`). Ctrl-C drains the pipeline and prints statistics.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::sync::atomic::Ordering;

use bev_relay::bench::run_benchmark;
use bev_relay::cli::{Cli, RunMode};
use bev_relay::ingest::still::load_still_frame_set;
use bev_relay::results::save_detections;
use bev_relay::{
    Calibration, CameraLayout, EngineRegistry, FrameSource, Pipeline, PipelineConfig,
};

#[path = "../ui.rs"]
mod ui;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&cli.ui), is_tty, !stdout_is_tty);

    let mut config = {
        let _stage = ui.stage("Load configuration");
        PipelineConfig::load()?
    };
    cli.apply_to(&mut config);

    log::info!("input path: {}", cli.input());
    log::info!("model: {}", cli.model);
    log::info!("precision: {}", cli.precision);
    log::info!(
        "mode: {}",
        match cli.mode() {
            RunMode::Video => "video",
            RunMode::Image => "image",
        }
    );

    let registry = EngineRegistry::with_builtin();
    match cli.mode() {
        RunMode::Video => run_video(&cli, &config, &registry, &ui),
        RunMode::Image => run_image(&cli, &config, &registry, &ui),
    }
}

fn camera_layout(config: &PipelineConfig) -> CameraLayout {
    let mut layout = CameraLayout::default();
    if config.cameras.count < layout.camera_count() {
        layout.names.truncate(config.cameras.count);
    }
    layout
}

fn run_video(
    cli: &Cli,
    config: &PipelineConfig,
    registry: &EngineRegistry,
    ui: &ui::Ui,
) -> Result<()> {
    let layout = camera_layout(config);
    let source = {
        let _stage = ui.stage("Open cameras");
        if cli.input().starts_with("stub://") {
            FrameSource::synthetic(
                &layout,
                Some(config.synthetic_frames),
                config.engine.input_width,
                config.engine.input_height,
            )
        } else {
            log::info!("loading videos from {}", cli.input());
            FrameSource::open(cli.input(), &layout)
        }
    };

    let mut pipeline = {
        let mut stage = ui.stage("Start pipeline");
        match Pipeline::start(
            config.pipeline_options(&cli.model, &cli.precision),
            source,
            registry,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                stage.fail();
                return Err(anyhow!(e).context("pipeline startup failed"));
            }
        }
    };

    let stop = pipeline.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!(
        "broadcasting detections to {}:{}",
        config.transport.dest_addr,
        config.transport.dest_port
    );
    pipeline.run();
    let summary = pipeline.finish();

    println!();
    println!("=== Inference Statistics ===");
    println!("frame sets read:      {}", summary.cycles);
    println!("frame sets inferred:  {}", summary.completed);
    println!("skipped (incomplete): {}", summary.skipped_incomplete);
    println!("skipped (engine):     {}", summary.inference_failures);
    println!("datagrams sent:       {}", summary.transport.datagrams_sent);
    for (camera, stream) in summary.streams.iter().enumerate() {
        println!(
            "camera {}: {} frames from {}",
            camera, stream.frames_captured, stream.path
        );
    }
    match summary.latency {
        Some(latency) => println!("{}", latency),
        None => println!("no frame set was inferred"),
    }
    if summary.buffers.outstanding() != 0 {
        log::error!(
            "{} adapted buffers were never released",
            summary.buffers.outstanding()
        );
    }
    Ok(())
}

fn run_image(
    cli: &Cli,
    config: &PipelineConfig,
    registry: &EngineRegistry,
    ui: &ui::Ui,
) -> Result<()> {
    let spec = config.engine_spec(&cli.model, &cli.precision);
    let mut engine = {
        let _stage = ui.stage("Create engine");
        registry.create(&spec)?
    };

    {
        let _stage = ui.stage("Load calibration");
        let calibration = Calibration::load(cli.input())?;
        engine
            .calibrate(&calibration)
            .context("engine calibration failed")?;
    }

    let set = {
        let _stage = ui.stage("Load images");
        load_still_frame_set(cli.input())
    };

    let report = {
        let _stage = ui.stage("Benchmark");
        run_benchmark(
            &mut *engine,
            &set,
            config.cameras.count,
            config.benchmark_iterations,
        )?
    };

    if let Some(latency) = report.latency {
        println!("{}", latency);
    }
    save_detections(spec.model_dir().join("result.txt"), &report.detections);
    Ok(())
}
