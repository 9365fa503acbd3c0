//! Boundary to the per-window speaker classifier.
//!
//! The classifier itself is an external model; this module only dispatches
//! windows to it, bounds each call in time, and screens its output.

use crate::error::DiarizationError;
use crate::segment::WindowPrediction;
use crate::window::Window;
use eyre::Result;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Output of one classifier call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerPrediction {
    pub speaker_id: String,
    /// Probability of `speaker_id`, in `[0, 1]`
    pub confidence: f32,
    /// Probability per known speaker
    pub probabilities: HashMap<String, f32>,
}

impl SpeakerPrediction {
    pub fn new(speaker_id: impl Into<String>, confidence: f32) -> Self {
        let speaker_id = speaker_id.into();
        let probabilities = HashMap::from([(speaker_id.clone(), confidence)]);
        Self {
            speaker_id,
            confidence,
            probabilities,
        }
    }
}

/// A trained speaker model: one fixed-length window in, one label out.
///
/// Implementations are shared across threads and concurrent runs, so any
/// internal state must be synchronized by the implementation.
pub trait SpeakerClassifier: Send + Sync {
    fn predict(&self, samples: &[f32], sample_rate: u32) -> Result<SpeakerPrediction>;
}

/// How windows are dispatched to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Maximum number of classifier calls in flight
    pub max_workers: usize,
    /// Per-call bound; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            max_workers: 1,
            timeout: None,
        }
    }
}

/// Counting gate on classifier calls that are still running.
///
/// A permit is held by the thread making the call, not by the caller waiting
/// on it, so a call that outlives its timeout keeps its slot until the model
/// actually returns.
struct CallPermits {
    running: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl CallPermits {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            running: Mutex::new(0),
            released: Condvar::new(),
            capacity: capacity.max(1),
        })
    }

    /// Wait for a free slot, at most `timeout` when one is given.
    fn acquire(self: &Arc<Self>, timeout: Option<Duration>) -> Option<CallPermit> {
        let deadline = timeout.map(|t| Instant::now() + t);
        // The guarded value is a plain counter, so a poisoned lock is still usable
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        while *running >= self.capacity {
            running = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    self.released
                        .wait_timeout(running, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .released
                    .wait(running)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
        *running += 1;
        Some(CallPermit(Arc::clone(self)))
    }

    fn running(&self) -> usize {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Released on drop, including when the classifier panics.
struct CallPermit(Arc<CallPermits>);

impl Drop for CallPermit {
    fn drop(&mut self) {
        let mut running = self.0.running.lock().unwrap_or_else(PoisonError::into_inner);
        *running = running.saturating_sub(1);
        self.0.released.notify_one();
    }
}

/// A shared classifier together with the limit on its concurrent calls.
///
/// At most `max_workers` calls run at once across every batch and streamed
/// window dispatched through the same pool, counting calls that already
/// timed out but have not returned yet.
#[derive(Clone)]
pub struct ClassifierPool {
    classifier: Arc<dyn SpeakerClassifier>,
    permits: Arc<CallPermits>,
    timeout: Option<Duration>,
}

impl ClassifierPool {
    pub fn new(classifier: Arc<dyn SpeakerClassifier>, options: ClassifyOptions) -> Self {
        Self {
            classifier,
            permits: CallPermits::new(options.max_workers),
            timeout: options.timeout,
        }
    }

    /// Number of classifier calls currently running.
    pub fn in_flight(&self) -> usize {
        self.permits.running()
    }

    /// Classify every window, dropping the ones whose call fails, times out,
    /// panics, or returns a malformed prediction.
    ///
    /// Surviving predictions keep the original window order. Waiting for a
    /// free worker counts against a window's timeout.
    pub fn classify_windows(
        &self,
        windows: Vec<Window>,
        sample_rate: u32,
    ) -> Vec<WindowPrediction> {
        let total = windows.len();
        let mut calls = Vec::with_capacity(total);
        for (index, window) in windows.into_iter().enumerate() {
            let span = (window.start_time, window.end_time);
            calls.push((index, span, self.dispatch(window.samples, sample_rate)));
        }

        let mut predictions = Vec::with_capacity(total);
        for (index, (start_time, end_time), call) in calls {
            match call.and_then(|call| call.wait(self.timeout)) {
                Ok(pred) => predictions.push(WindowPrediction {
                    start_time,
                    end_time,
                    speaker_id: pred.speaker_id,
                    confidence: pred.confidence,
                }),
                Err(e) => warn!(
                    "Dropping window {} ({:.2}s-{:.2}s): {:#}",
                    index, start_time, end_time, e
                ),
            }
        }

        debug!("Classified {} of {} windows", predictions.len(), total);
        predictions
    }

    /// Classify a single window, surfacing failure to the caller.
    pub fn classify_one(&self, samples: Vec<f32>, sample_rate: u32) -> Result<SpeakerPrediction> {
        self.dispatch(samples, sample_rate)?.wait(self.timeout)
    }

    fn dispatch(&self, samples: Vec<f32>, sample_rate: u32) -> Result<PendingCall> {
        let queued = Instant::now();
        let permit = self
            .permits
            .acquire(self.timeout)
            .ok_or(DiarizationError::Timeout(self.timeout.unwrap_or_default()))?;

        let classifier = Arc::clone(&self.classifier);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _permit = permit;
            let result = classifier.predict(&samples, sample_rate);
            // Receiver is gone when the call already timed out
            let _ = tx.send((result, queued.elapsed()));
        });
        Ok(PendingCall { rx, queued })
    }
}

type CallResult = (Result<SpeakerPrediction>, Duration);

/// A dispatched call; its timeout runs from when it was queued.
struct PendingCall {
    rx: mpsc::Receiver<CallResult>,
    queued: Instant,
}

impl PendingCall {
    fn wait(self, timeout: Option<Duration>) -> Result<SpeakerPrediction> {
        let panicked = || DiarizationError::Classifier("classifier panicked".to_string());
        let (result, elapsed) = match timeout {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.queued.elapsed());
                self.rx.recv_timeout(remaining).map_err(|e| match e {
                    mpsc::RecvTimeoutError::Timeout => DiarizationError::Timeout(limit),
                    mpsc::RecvTimeoutError::Disconnected => panicked(),
                })?
            }
            None => self.rx.recv().map_err(|_| panicked())?,
        };

        // A result may sit in the channel while earlier windows are awaited
        if let Some(limit) = timeout {
            if elapsed > limit {
                return Err(DiarizationError::Timeout(limit).into());
            }
        }

        let prediction = result?;
        check_prediction(&prediction)?;
        Ok(prediction)
    }
}

fn check_prediction(prediction: &SpeakerPrediction) -> Result<(), DiarizationError> {
    if prediction.speaker_id.is_empty() {
        return Err(DiarizationError::Classifier("empty speaker id".to_string()));
    }
    if !(0.0..=1.0).contains(&prediction.confidence) {
        return Err(DiarizationError::Classifier(format!(
            "confidence {} outside [0, 1]",
            prediction.confidence
        )));
    }
    Ok(())
}
