//! Audio-driven frame rendering.
//!
//! A [`Waveform`] is analyzed into a [`FeatureSeries`] (one loudness value or
//! one vector of band magnitudes per video frame), each feature vector is
//! rasterized by a [`FrameRenderer`], and the frames are written in parallel
//! to an ordered [`FrameStore`] ready for muxing.

pub mod audio;
pub mod encode;
pub mod error;
pub mod job;
pub mod render;
pub mod settings;

use image::RgbImage;
use std::f64::consts::TAU;

pub use audio::features::FeatureSeries;
pub use audio::Waveform;
pub use error::{FrameFailure, VisError, VisResult};
pub use job::{RenderJob, WorkDir};
pub use render::frame::FrameRenderer;
pub use render::pipeline::{FramePipeline, FrameStore};
pub use settings::{Color, Style, StyleKind, Visualization, VisualizationSettings};

/// Renders every frame of `waveform` into a fresh temporary directory.
///
/// The returned job owns the directory; dropping it deletes the frames.
pub fn produce_video_frames(
    waveform: &Waveform,
    settings: &VisualizationSettings,
) -> VisResult<RenderJob> {
    produce_video_frames_in(waveform, settings, WorkDir::temporary()?, &FramePipeline::default())
}

pub fn produce_video_frames_in(
    waveform: &Waveform,
    settings: &VisualizationSettings,
    workdir: WorkDir,
    pipeline: &FramePipeline,
) -> VisResult<RenderJob> {
    // Everything that can be rejected up front is, before any worker starts.
    let renderer = FrameRenderer::new(settings)?;
    waveform.check()?;
    let series = audio::analysis::analyze(waveform, settings)?;

    let store = match pipeline.run(&renderer, &series, settings.framerate, workdir.path()) {
        Ok(store) => store,
        Err(err) => {
            // A failed job leaves no frames behind, even in a kept directory.
            if !workdir.is_temporary() {
                if let Err(e) = workdir.discard_contents() {
                    log::warn!("Failed to clear {}: {}", workdir.path().display(), e);
                }
            }
            return Err(err);
        }
    };
    Ok(RenderJob {
        settings: settings.clone(),
        series,
        store,
        workdir,
    })
}

/// First frame of `sample` under `settings`, rendered serially.
pub fn produce_preview_frame(
    sample: &Waveform,
    settings: &VisualizationSettings,
) -> VisResult<RgbImage> {
    let renderer = FrameRenderer::new(settings)?;
    sample.check()?;
    let series = audio::analysis::analyze(sample, settings)?;
    if series.is_empty() {
        return Err(VisError::analysis("preview sample produced no frames"));
    }
    renderer.render(series.frame(0))
}

/// Deterministic stand-in for real audio: a few harmonics of 110 Hz under a
/// slow tremolo, peaking a little below full scale.
pub fn reference_waveform(sample_rate: u32, seconds: f64) -> Waveform {
    const PARTIALS: [(f64, f64); 4] = [(110.0, 0.5), (220.0, 0.3), (440.0, 0.25), (1320.0, 0.15)];

    let len = (sample_rate as f64 * seconds.max(0.0)).round() as usize;
    let samples = (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate.max(1) as f64;
            let tremolo = 0.75 + 0.25 * (TAU * 2.0 * t).cos();
            let sum: f64 = PARTIALS
                .iter()
                .map(|&(freq, amp)| amp * (TAU * freq * t).sin())
                .sum();
            (0.8 * tremolo * sum) as f32
        })
        .collect();
    Waveform::new(samples, sample_rate)
}
