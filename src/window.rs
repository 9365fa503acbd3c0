use crate::audio::AudioSignal;
use crate::error::DiarizationError;

/// A fixed-length analysis slice of a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Always exactly the configured window length; zero-padded at the tail
    pub samples: Vec<f32>,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds, clipped to the end of the signal for the tail window
    pub end_time: f64,
}

/// Iterator over the overlapping windows of a signal.
///
/// Cloning yields an independent iterator from the same position.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    signal: &'a AudioSignal,
    window_samples: usize,
    hop_samples: usize,
    next_start: usize,
    done: bool,
}

impl Iterator for Windows<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.done {
            return None;
        }

        let samples = self.signal.samples();
        let rate = self.signal.sample_rate() as f64;
        let start = self.next_start;

        if start + self.window_samples <= samples.len() {
            self.next_start += self.hop_samples;
            return Some(Window {
                samples: samples[start..start + self.window_samples].to_vec(),
                start_time: start as f64 / rate,
                end_time: (start + self.window_samples) as f64 / rate,
            });
        }

        self.done = true;
        if start >= samples.len() {
            return None;
        }

        let mut padded = Vec::with_capacity(self.window_samples);
        padded.extend_from_slice(&samples[start..]);
        padded.resize(self.window_samples, 0.0);
        Some(Window {
            samples: padded,
            start_time: start as f64 / rate,
            end_time: samples.len() as f64 / rate,
        })
    }
}

/// Slice `signal` into windows of `window_duration` seconds every
/// `hop_duration` seconds.
///
/// Windows start at sample 0 and advance by the hop while a full window
/// fits. A non-empty remainder becomes one final zero-padded window.
pub fn extract_windows(
    signal: &AudioSignal,
    window_duration: f64,
    hop_duration: f64,
) -> Result<Windows<'_>, DiarizationError> {
    let rate = signal.sample_rate() as f64;
    let window_samples = seconds_to_samples(window_duration, rate);
    let hop_samples = seconds_to_samples(hop_duration, rate);

    if window_samples == 0 || hop_samples == 0 {
        return Err(DiarizationError::InvalidWindow {
            window_duration,
            hop_duration,
            sample_rate: signal.sample_rate(),
        });
    }

    Ok(Windows {
        signal,
        window_samples,
        hop_samples,
        next_start: 0,
        done: false,
    })
}

fn seconds_to_samples(seconds: f64, rate: f64) -> usize {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * rate) as usize
    } else {
        0
    }
}
