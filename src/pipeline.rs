//! Diarization Pipeline Module
//!
//! Batch flow over one recording:
//! - Windowing (fixed-length, overlapping)
//! - Per-window speaker classification
//! - Majority-vote smoothing
//! - Merging same-speaker runs
//! - Short-segment absorption and gap filling
//!
//! plus a single-window variant for streaming use.

use crate::audio::{AudioLoader, AudioSignal};
use crate::classifier::{ClassifierPool, SpeakerClassifier};
use crate::config::DiarizationConfig;
use crate::refine::{fill_gaps, filter_short_segments};
use crate::registry::{EnumeratorList, EnumeratorRegistry, SpeakerRole};
use crate::segment::{label_segments, merge_predictions, DiarizationSegment, LabeledSegment};
use crate::smoothing::smooth_predictions;
use crate::window::extract_windows;
use crate::wav;
use chrono::{DateTime, Local};
use eyre::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Steps of a batch run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loaded,
    Windowed,
    Classified,
    Smoothed,
    Merged,
    Refined,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of classifying one streamed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeResult {
    pub speaker_id: String,
    pub role: SpeakerRole,
    pub confidence: f32,
    /// True when a previous speaker was given and differs from this one
    pub speaker_changed: bool,
    pub is_enumerator: bool,
    pub enumerator_name: Option<String>,
    pub timestamp: DateTime<Local>,
}

/// Full diarization pipeline: window → classify → smooth → merge → refine
///
/// Every run and streamed window goes through one classifier pool, so
/// `max_workers` bounds the calls running on the model at any time.
pub struct DiarizationPipeline {
    classifier: Arc<dyn SpeakerClassifier>,
    pool: ClassifierPool,
    registry: Arc<dyn EnumeratorRegistry>,
    config: DiarizationConfig,
}

impl DiarizationPipeline {
    /// Create a pipeline around an already loaded classifier, with default
    /// settings and no registered enumerators.
    pub fn new(classifier: Arc<dyn SpeakerClassifier>) -> Self {
        let config = DiarizationConfig::default();
        Self {
            pool: ClassifierPool::new(Arc::clone(&classifier), config.classify_options()),
            classifier,
            registry: Arc::new(EnumeratorList::new()),
            config,
        }
    }

    pub fn with_config(mut self, config: DiarizationConfig) -> Self {
        self.config = config;
        self.reset_pool()
    }

    pub fn with_registry(mut self, registry: Arc<dyn EnumeratorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Set window length and hop in seconds (default: 3.5s / 1.0s)
    pub fn with_window(mut self, window_duration: f64, hop_duration: f64) -> Self {
        self.config.window_duration = window_duration;
        self.config.hop_duration = hop_duration;
        self
    }

    /// Set majority-vote neighborhood size (default: 3)
    pub fn with_smoothing_window(mut self, size: usize) -> Self {
        self.config.smoothing_window = size;
        self
    }

    /// Set minimum standalone segment duration (default: 0.5s)
    pub fn with_min_segment_duration(mut self, seconds: f64) -> Self {
        self.config.min_segment_duration = seconds;
        self
    }

    /// Set gap closing threshold (default: 0.3s)
    pub fn with_gap_threshold(mut self, seconds: f64) -> Self {
        self.config.gap_threshold = seconds;
        self
    }

    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self.reset_pool()
    }

    /// Bound each classifier call; `None` disables the bound.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.classify_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self.reset_pool()
    }

    fn reset_pool(mut self) -> Self {
        let options = self.config.classify_options();
        self.pool = ClassifierPool::new(Arc::clone(&self.classifier), options);
        self
    }

    /// Load an audio file and diarize it.
    pub fn diarize_file<P: AsRef<Path>>(
        &self,
        audio_path: P,
        loader: &dyn AudioLoader,
    ) -> Result<Vec<DiarizationSegment>> {
        let path = audio_path.as_ref();
        info!("Starting diarization for {}", path.display());
        let signal = loader
            .load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        self.diarize(&signal)
    }

    /// Diarize a loaded signal.
    ///
    /// Windows the classifier cannot label are skipped; if none can be
    /// labeled the result is empty. Invalid settings abort the run.
    pub fn diarize(&self, signal: &AudioSignal) -> Result<Vec<DiarizationSegment>> {
        let config = &self.config;
        config.validate().context("invalid diarization config")?;
        info!(
            "Diarizing {:.2}s of audio at {} Hz",
            signal.duration(),
            signal.sample_rate()
        );
        debug!("Stage {}", Stage::Loaded);

        let windows: Vec<_> = extract_windows(signal, config.window_duration, config.hop_duration)
            .wrap_err_with(|| format!("diarization failed at stage {}", Stage::Windowed))?
            .collect();
        debug!("Stage {}: {} windows", Stage::Windowed, windows.len());

        let predictions = self.pool.classify_windows(windows, signal.sample_rate());
        debug!("Stage {}: {} predictions", Stage::Classified, predictions.len());

        let smoothed = smooth_predictions(&predictions, config.smoothing_window);
        debug!("Stage {}", Stage::Smoothed);

        let merged = merge_predictions(&smoothed);
        debug!("Stage {}: {} segments", Stage::Merged, merged.len());

        let filtered = filter_short_segments(merged, config.min_segment_duration);
        let segments = fill_gaps(filtered, config.gap_threshold);
        debug!("Stage {}: {} segments", Stage::Refined, segments.len());

        info!("Final diarization: {} segments", segments.len());
        debug!("Stage {}", Stage::Done);
        Ok(segments)
    }

    /// Diarize and tag each segment with its speaker's interview role.
    pub fn diarize_labeled(&self, signal: &AudioSignal) -> Result<Vec<LabeledSegment>> {
        let segments = self.diarize(signal)?;
        Ok(label_segments(&segments, self.registry.as_ref()))
    }

    /// Classify one window in isolation, without smoothing or merging.
    pub fn real_time_diarization(
        &self,
        window: &[f32],
        sample_rate: u32,
        previous_speaker: Option<&str>,
    ) -> Result<RealtimeResult> {
        let prediction = self.pool.classify_one(window.to_vec(), sample_rate)?;

        let speaker_changed = previous_speaker.is_some_and(|prev| prev != prediction.speaker_id);
        let role = self.registry.role_of(&prediction.speaker_id);
        let is_enumerator = role == SpeakerRole::Enumerator;
        let enumerator_name = if is_enumerator {
            self.registry.enumerator_name(&prediction.speaker_id)
        } else {
            None
        };

        Ok(RealtimeResult {
            speaker_id: prediction.speaker_id,
            role,
            confidence: prediction.confidence,
            speaker_changed,
            is_enumerator,
            enumerator_name,
            timestamp: Local::now(),
        })
    }
}

/// Write each segment's audio to `output_dir` as a WAV file.
///
/// Returns the written paths in segment order.
pub fn save_speaker_segments(
    signal: &AudioSignal,
    segments: &[DiarizationSegment],
    output_dir: &Path,
) -> Result<Vec<std::path::PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut paths = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let filename = format!(
            "segment_{:03}_{}_{:.2}-{:.2}.wav",
            i,
            segment.speaker_id(),
            segment.start_time(),
            segment.end_time()
        );
        let path = output_dir.join(filename);
        let audio = signal.slice_seconds(segment.start_time(), segment.end_time());
        wav::write_wav(&path, audio, signal.sample_rate())?;
        paths.push(path);
    }

    info!("Saved {} segments to {}", paths.len(), output_dir.display());
    Ok(paths)
}
