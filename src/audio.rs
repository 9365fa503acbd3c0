use crate::error::DiarizationError;
use eyre::Result;
use std::path::Path;

/// Mono audio samples with their sample rate.
///
/// Construction validates the signal, so every stage downstream can assume
/// a non-empty, finite signal with a usable rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, DiarizationError> {
        if sample_rate == 0 {
            return Err(DiarizationError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(DiarizationError::EmptySignal);
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DiarizationError::NonFiniteSample { index });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Build a signal from 16-bit PCM, scaling into `[-1.0, 1.0)`.
    pub fn from_i16(samples: &[i16], sample_rate: u32) -> Result<Self, DiarizationError> {
        let samples = samples.iter().map(|&s| s as f32 / 32768.0).collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal; kept for the `len` convention.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples between two timestamps, clamped to the signal bounds.
    pub fn slice_seconds(&self, start: f64, end: f64) -> &[f32] {
        let rate = self.sample_rate as f64;
        let start = ((start.max(0.0) * rate) as usize).min(self.samples.len());
        let end = ((end.max(0.0) * rate) as usize).clamp(start, self.samples.len());
        &self.samples[start..end]
    }
}

/// Source of decoded audio. Container parsing lives behind this trait.
pub trait AudioLoader {
    fn load(&self, path: &Path) -> Result<AudioSignal>;
}
