pub mod analysis;
pub mod decode;
pub mod features;
pub mod stft;

use crate::error::{VisError, VisResult};

/// Mono amplitude samples plus their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Rejects waveforms the analyzer cannot work with.
    pub fn check(&self) -> VisResult<()> {
        if self.sample_rate == 0 {
            return Err(VisError::analysis("waveform has a zero sample rate"));
        }
        if self.samples.is_empty() {
            return Err(VisError::analysis("waveform has no samples"));
        }
        if let Some(pos) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(VisError::analysis(format!(
                "waveform sample {} is not finite",
                pos
            )));
        }
        Ok(())
    }

    /// Number of output frames: `ceil(duration * fps)`.
    pub fn frame_count(&self, fps: u32) -> usize {
        if self.sample_rate == 0 {
            return 0;
        }
        let n = self.samples.len() as u64 * fps as u64;
        n.div_ceil(self.sample_rate as u64) as usize
    }
}
