use std::time::Instant;

use super::features::{self, FeatureSeries};
use super::Waveform;
use crate::error::VisResult;
use crate::settings::VisualizationSettings;

/// Temporal smoothing kernel applied along the frame axis.
const SMOOTHING_KERNEL: [f32; 3] = [0.25, 0.5, 0.25];

/// Builds the feature series for a whole job.
///
/// Pass 1 runs the short-time transform and feature extraction, pass 2 applies
/// optional temporal smoothing. The series is fully materialized before any
/// frame is rendered since spectrum normalization depends on its global peak.
pub fn analyze(waveform: &Waveform, settings: &VisualizationSettings) -> VisResult<FeatureSeries> {
    let started = Instant::now();
    let total_frames = waveform.frame_count(settings.framerate);

    log::info!(
        "Pass 1: {:?} features ({} frames, {:.2}s @ {}Hz)...",
        settings.visualization,
        total_frames,
        waveform.duration(),
        waveform.sample_rate
    );
    let series = features::extract(waveform, settings)?;

    let series = if settings.smoothing {
        log::info!("Pass 2: Temporal smoothing...");
        smooth(&series)
    } else {
        series
    };

    log::info!("Calculating data: {:.2}s", started.elapsed().as_secs_f32());
    Ok(series)
}

/// Convolves each component with `[0.25, 0.5, 0.25]`, replicating edge frames.
pub fn smooth(series: &FeatureSeries) -> FeatureSeries {
    let n = series.len();
    let width = series.width();
    if n == 0 {
        return series.clone();
    }

    let mut out = Vec::with_capacity(n * width);
    for i in 0..n {
        let prev = series.frame(i.saturating_sub(1));
        let cur = series.frame(i);
        let next = series.frame((i + 1).min(n - 1));
        out.extend((0..width).map(|j| {
            SMOOTHING_KERNEL[0] * prev[j] + SMOOTHING_KERNEL[1] * cur[j] + SMOOTHING_KERNEL[2] * next[j]
        }));
    }

    series.with_values(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Visualization;

    fn series(values: Vec<f32>, width: usize) -> FeatureSeries {
        FeatureSeries::new(values, width).unwrap()
    }

    #[test]
    fn smoothing_constant_series_is_unchanged() {
        let s = series(vec![0.4; 12], 3);
        let out = smooth(&s);
        assert_eq!(out.len(), 4);
        for (a, b) in out.frames().flatten().zip(s.frames().flatten()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn smoothing_spreads_an_impulse() {
        let s = series(vec![0.0, 0.0, 1.0, 0.0, 0.0], 1);
        let out = smooth(&s);
        let got: Vec<f32> = out.frames().map(|f| f[0]).collect();
        assert_eq!(got, vec![0.0, 0.25, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn smoothing_replicates_edges() {
        let s = series(vec![1.0, 0.0, 0.0], 1);
        let out = smooth(&s);
        // Virtual neighbour before frame 0 is frame 0 itself.
        assert!((out.frame(0)[0] - 0.75).abs() < 1e-6);
        assert!((out.frame(1)[0] - 0.25).abs() < 1e-6);
        assert_eq!(out.frame(2)[0], 0.0);
    }

    #[test]
    fn smoothing_single_frame_is_identity() {
        let s = series(vec![0.3, 0.9], 2);
        let out = smooth(&s);
        assert!((out.frame(0)[0] - 0.3).abs() < 1e-6);
        assert!((out.frame(0)[1] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn analyze_applies_smoothing_when_enabled() {
        let sr = 8_000;
        let mut samples = vec![0.0f32; 8_000];
        for (i, s) in samples.iter_mut().enumerate().skip(4_000) {
            *s = (2.0 * std::f64::consts::PI * 200.0 * i as f64 / sr as f64).sin() as f32;
        }
        let base = VisualizationSettings {
            visualization: Visualization::Volume,
            framerate: 10,
            smoothing: false,
            ..Default::default()
        };
        let wave = Waveform::new(samples, sr);
        let raw = analyze(&wave, &base).unwrap();
        let smoothed = analyze(
            &wave,
            &VisualizationSettings {
                smoothing: true,
                ..base
            },
        )
        .unwrap();
        assert_eq!(raw.len(), smoothed.len());
        assert_eq!(raw.frame(4)[0], 0.0);
        assert!((smoothed.frame(4)[0] - 0.25).abs() < 1e-3);
    }
}
