mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

use audiovis::audio::decode::decode_audio;
use audiovis::encode::ffmpeg;
use audiovis::{FramePipeline, VisualizationSettings, WorkDir};
use cli::{Cli, Command, CommonArgs};
use config::Config;

/// Length of audio sampled for a preview frame.
const PREVIEW_SECONDS: f64 = 1.0;
const REFERENCE_SAMPLE_RATE: u32 = 44_100;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            input,
            output,
            common,
            jobs,
            keep_frames,
        } => render(&input, output, &common, jobs, keep_frames),
        Command::Preview {
            input,
            output,
            common,
        } => preview(input.as_deref(), &output, &common),
    }
}

/// Layers defaults, TOML config, settings JSON and CLI flags, in that order.
fn resolve_settings(common: &CommonArgs) -> Result<(VisualizationSettings, Config)> {
    let config = match config::find_config(common.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) if common.config.is_none() => {
                log::warn!("Ignoring config: {:#}", err);
                Config::default()
            }
            Err(err) => return Err(err),
        },
        None => Config::default(),
    };

    let mut settings = config.visualization.clone().unwrap_or_default();
    if let Some(ref path) = common.settings {
        let patch = config::load_settings_json(path)?;
        settings = config::overlay(&settings, &patch)?;
        log::info!("Loaded settings from {}", path.display());
    }
    common.style.apply(&mut settings);

    let kind = settings.validate()?;
    log::debug!("Resolved style: {:?}", kind);
    Ok((settings, config))
}

fn render(
    input: &Path,
    output: Option<PathBuf>,
    common: &CommonArgs,
    jobs: Option<usize>,
    keep_frames: Option<PathBuf>,
) -> Result<()> {
    let total = Instant::now();
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let (settings, config) = resolve_settings(common)?;
    let output = output.unwrap_or_else(|| PathBuf::from(settings.output_file_name()));

    log::info!("audiovis - audio visualizer");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", output.display());
    log::info!(
        "Mode: {:?}/{:?}/{}",
        settings.visualization,
        settings.style,
        settings.style_variant
    );
    log::info!(
        "Resolution: {}x{} @ {}fps",
        settings.width,
        settings.height,
        settings.framerate
    );

    // 1. Decode
    let started = Instant::now();
    let (start, end) = settings.start_end;
    let waveform = decode_audio(input, start, end)?;
    log::info!("Loading audio: {:.2}s", started.elapsed().as_secs_f32());

    // 2. Analyze and render frames
    let workdir = match keep_frames {
        Some(ref dir) => WorkDir::persistent(dir)?,
        None => WorkDir::temporary()?,
    };
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );
    let pipeline = FramePipeline::new(jobs.or(config.render.jobs)).with_progress(pb);
    let job = audiovis::produce_video_frames_in(&waveform, &settings, workdir, &pipeline)?;
    drop(waveform);

    // 3. Mux
    let started = Instant::now();
    log::info!("Encoding video...");
    ffmpeg::assemble(job.store(), input, start, &output, &config.output)?;
    log::info!("Encoding: {:.2}s", started.elapsed().as_secs_f32());

    if !job.workdir().is_temporary() {
        log::info!("Frames kept in {}", job.workdir().path().display());
    }
    log::info!("Total: {:.2}s", total.elapsed().as_secs_f32());
    log::info!("Done! Output: {}", output.display());
    Ok(())
}

fn preview(input: Option<&Path>, output: &Path, common: &CommonArgs) -> Result<()> {
    let (settings, _) = resolve_settings(common)?;

    let sample = match input {
        Some(path) => {
            let (start, end) = settings.start_end;
            let limit = start + PREVIEW_SECONDS;
            let end = Some(end.map_or(limit, |e| e.min(limit)));
            decode_audio(path, start, end)?
        }
        None => {
            log::info!("No input given, using the reference signal");
            audiovis::reference_waveform(REFERENCE_SAMPLE_RATE, PREVIEW_SECONDS)
        }
    };

    let img = audiovis::produce_preview_frame(&sample, &settings)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    img.save(output)
        .with_context(|| format!("Failed to write preview {}", output.display()))?;
    log::info!("Preview written to {}", output.display());
    Ok(())
}
