use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a diarization run or an export.
///
/// Per-window classifier failures are not surfaced through this type during
/// a batch run; those windows are dropped. The classifier variants only
/// reach callers through the single-window real-time path.
#[derive(Debug, Error)]
pub enum DiarizationError {
    #[error("audio signal is empty")]
    EmptySignal,

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("window of {window_duration}s with hop {hop_duration}s is empty at {sample_rate} Hz")]
    InvalidWindow {
        window_duration: f64,
        hop_duration: f64,
        sample_rate: u32,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("classifier timed out after {0:?}")]
    Timeout(std::time::Duration),
}
