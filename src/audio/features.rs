use rayon::prelude::*;

use super::stft::{self, Window};
use super::Waveform;
use crate::error::{VisError, VisResult};
use crate::settings::{Visualization, VisualizationSettings};

/// Amplitude floor used by the decibel conversion.
const AMIN: f32 = 1e-5;
/// Decibel range mapped onto `[0, 1]` in volume mode.
const DB_RANGE: f32 = 60.0;

/// One feature vector per output frame, stored flat.
///
/// Volume mode has a single component per frame, spectrum mode has `bins`.
/// Every component lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSeries {
    values: Vec<f32>,
    width: usize,
}

impl FeatureSeries {
    pub fn new(values: Vec<f32>, width: usize) -> VisResult<Self> {
        if width == 0 || values.len() % width != 0 {
            return Err(VisError::analysis(format!(
                "{} values do not form frames of width {}",
                values.len(),
                width
            )));
        }
        Ok(Self { values, width })
    }

    /// Same shape, new values.
    pub(crate) fn with_values(&self, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            values,
            width: self.width,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Components per frame.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        &self.values[index * self.width..(index + 1) * self.width]
    }

    pub fn frames(&self) -> std::slice::Chunks<'_, f32> {
        self.values.chunks(self.width)
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0f32, f32::max)
    }
}

/// Runs the feature extractor selected by `settings.visualization`.
pub fn extract(waveform: &Waveform, settings: &VisualizationSettings) -> VisResult<FeatureSeries> {
    waveform.check()?;
    let window_len = settings.samples_per_frame(waveform.sample_rate)?;
    let frame_count = waveform.frame_count(settings.framerate);
    let (min_hz, max_hz) = settings.min_max_frequency;

    let band_bins = stft::bin_frequencies(window_len, waveform.sample_rate)
        .iter()
        .filter(|&&f| f >= min_hz && f <= max_hz)
        .count();
    if band_bins == 0 {
        return Err(VisError::analysis(format!(
            "frequency band [{}, {}] Hz contains no analysis bins (bin spacing {:.1} Hz)",
            min_hz,
            max_hz,
            waveform.sample_rate as f32 / window_len as f32
        )));
    }

    log::debug!(
        "window={} samples, frames={}, band bins={}",
        window_len,
        frame_count,
        band_bins
    );

    match settings.visualization {
        Visualization::Volume => extract_volume(waveform, window_len, frame_count, min_hz, max_hz),
        Visualization::Spectrum => {
            extract_spectrum(waveform, window_len, frame_count, min_hz, max_hz, settings.bins)
        }
    }
}

fn extract_volume(
    waveform: &Waveform,
    window_len: usize,
    frame_count: usize,
    min_hz: f32,
    max_hz: f32,
) -> VisResult<FeatureSeries> {
    let mut spec = stft::analyze(
        &waveform.samples,
        waveform.sample_rate,
        window_len,
        frame_count,
        Window::Rectangular,
    )?;
    spec.retain_band(min_hz, max_hz);
    let filtered = spec.inverse();

    let rms: Vec<f32> = filtered
        .chunks(window_len)
        .map(|chunk| (chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32).sqrt())
        .collect();

    let peak_rms = rms.iter().copied().fold(0.0f32, f32::max);
    if peak_rms < AMIN {
        log::info!("Selected band is silent; volume stays at zero");
        return FeatureSeries::new(vec![0.0; rms.len()], 1);
    }

    let ref_db = 20.0 * peak_rms.log10();
    let values = rms
        .iter()
        .map(|&r| {
            let db = 20.0 * r.max(AMIN).log10() - ref_db;
            ((db + DB_RANGE) / DB_RANGE).clamp(0.0, 1.0)
        })
        .collect();
    FeatureSeries::new(values, 1)
}

fn extract_spectrum(
    waveform: &Waveform,
    window_len: usize,
    frame_count: usize,
    min_hz: f32,
    max_hz: f32,
    bins: usize,
) -> VisResult<FeatureSeries> {
    let spec = stft::analyze(
        &waveform.samples,
        waveform.sample_rate,
        window_len,
        frame_count,
        Window::Hann,
    )?;
    let band: Vec<usize> = spec
        .frequencies()
        .iter()
        .enumerate()
        .filter(|(_, &f)| f >= min_hz && f <= max_hz)
        .map(|(k, _)| k)
        .collect();

    let mut values = vec![0.0f32; frame_count * bins];
    values
        .par_chunks_mut(bins)
        .enumerate()
        .for_each(|(frame_idx, out)| {
            let row = spec.frame(frame_idx);
            let magnitudes: Vec<f32> = band.iter().map(|&k| row[k].norm()).collect();
            rebin_into(&magnitudes, out);
        });

    // Normalization needs the whole series materialized first.
    let peak = values.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for v in values.iter_mut() {
            *v = (*v / peak).clamp(0.0, 1.0);
        }
    } else {
        log::info!("Selected band is silent; spectrum stays at zero");
    }
    FeatureSeries::new(values, bins)
}

/// Reduces `magnitudes` to exactly `bins` values.
///
/// Fewer inputs than outputs: linear interpolation across bin index.
/// Otherwise: contiguous groups of `len / bins` inputs, averaged.
pub fn rebin(magnitudes: &[f32], bins: usize) -> Vec<f32> {
    let mut out = vec![0.0; bins];
    rebin_into(magnitudes, &mut out);
    out
}

fn rebin_into(magnitudes: &[f32], out: &mut [f32]) {
    let n = magnitudes.len();
    let bins = out.len();
    if n == 0 || bins == 0 {
        out.fill(0.0);
        return;
    }

    if n < bins {
        if n == 1 {
            out.fill(magnitudes[0]);
            return;
        }
        let step = (n - 1) as f32 / (bins - 1) as f32;
        for (j, slot) in out.iter_mut().enumerate() {
            let pos = j as f32 * step;
            let lo = (pos.floor() as usize).min(n - 2);
            let frac = pos - lo as f32;
            *slot = magnitudes[lo] * (1.0 - frac) + magnitudes[lo + 1] * frac;
        }
    } else {
        for (i, slot) in out.iter_mut().enumerate() {
            let start = i * n / bins;
            let end = (i + 1) * n / bins;
            let group = &magnitudes[start..end];
            *slot = group.iter().sum::<f32>() / group.len() as f32;
        }
    }
}
