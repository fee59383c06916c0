//! Short-time Fourier transform with hop equal to the window length.
//!
//! Frame `i` covers samples `[i * w, (i + 1) * w)`; samples past the end of the
//! waveform read as zero, so the last partial frame is zero-padded.

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{VisError, VisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Periodic Hann window; used for magnitude analysis.
    Hann,
    /// No tapering; makes the inverse transform exact.
    Rectangular,
}

impl Window {
    fn coefficients(self, size: usize) -> Vec<f32> {
        match self {
            Window::Rectangular => vec![1.0; size],
            Window::Hann => (0..size)
                .map(|i| {
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos())
                })
                .collect(),
        }
    }
}

/// One-sided complex time–frequency matrix, row-major by frame.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    data: Vec<Complex<f32>>,
    frame_count: usize,
    bin_count: usize,
    window_len: usize,
    sample_rate: u32,
    window: Window,
}

impl Spectrogram {
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// `window_len / 2 + 1` bins, DC through Nyquist.
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn frame(&self, index: usize) -> &[Complex<f32>] {
        let start = index * self.bin_count;
        &self.data[start..start + self.bin_count]
    }

    /// Center frequency in Hz of every bin.
    pub fn frequencies(&self) -> Vec<f32> {
        bin_frequencies(self.window_len, self.sample_rate)
    }

    /// Zeroes every bin whose center frequency lies outside `[min_hz, max_hz]`.
    pub fn retain_band(&mut self, min_hz: f32, max_hz: f32) {
        let keep: Vec<bool> = self
            .frequencies()
            .iter()
            .map(|&f| f >= min_hz && f <= max_hz)
            .collect();
        for row in self.data.chunks_mut(self.bin_count) {
            for (value, &k) in row.iter_mut().zip(keep.iter()) {
                if !k {
                    *value = Complex::new(0.0, 0.0);
                }
            }
        }
    }

    /// Inverts the transform back to `frame_count * window_len` samples.
    pub fn inverse(&self) -> Vec<f32> {
        let w = self.window_len;
        let ifft = FftPlanner::<f32>::new().plan_fft_inverse(w);
        let coeffs = self.window.coefficients(w);
        let scale = 1.0 / w as f32;

        let mut out = vec![0.0f32; self.frame_count * w];
        out.par_chunks_mut(w)
            .zip(self.data.par_chunks(self.bin_count))
            .for_each(|(samples, row)| {
                let mut buf: Vec<Complex<f32>> = (0..w)
                    .map(|k| {
                        if k < self.bin_count {
                            row[k]
                        } else {
                            row[w - k].conj()
                        }
                    })
                    .collect();
                ifft.process(&mut buf);
                for ((dst, c), &win) in samples.iter_mut().zip(buf.iter()).zip(coeffs.iter()) {
                    *dst = if win > 1e-3 { c.re * scale / win } else { 0.0 };
                }
            });
        out
    }
}

pub fn bin_frequencies(window_len: usize, sample_rate: u32) -> Vec<f32> {
    let bins = window_len / 2 + 1;
    (0..bins)
        .map(|k| k as f32 * sample_rate as f32 / window_len as f32)
        .collect()
}

/// Forward transform producing exactly `frame_count` frames.
pub fn analyze(
    samples: &[f32],
    sample_rate: u32,
    window_len: usize,
    frame_count: usize,
    window: Window,
) -> VisResult<Spectrogram> {
    if window_len == 0 {
        return Err(VisError::analysis("analysis window length must be positive"));
    }
    let bin_count = window_len / 2 + 1;
    let fft = FftPlanner::<f32>::new().plan_fft_forward(window_len);
    let coeffs = window.coefficients(window_len);

    let mut data = vec![Complex::new(0.0f32, 0.0); frame_count * bin_count];
    data.par_chunks_mut(bin_count)
        .enumerate()
        .for_each(|(frame_idx, row)| {
            let start = frame_idx * window_len;
            let mut buf: Vec<Complex<f32>> = coeffs
                .iter()
                .enumerate()
                .map(|(i, &c)| Complex::new(samples.get(start + i).copied().unwrap_or(0.0) * c, 0.0))
                .collect();
            fft.process(&mut buf);
            row.copy_from_slice(&buf[..bin_count]);
        });

    Ok(Spectrogram {
        data,
        frame_count,
        bin_count,
        window_len,
        sample_rate,
        window,
    })
}
