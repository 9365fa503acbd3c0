//! Speaker diarization for recorded survey interviews.
//!
//! A recording is cut into overlapping windows, each window is labeled by an
//! injected [`SpeakerClassifier`], and the label stream is smoothed, merged
//! and refined into time-ordered [`DiarizationSegment`]s that say who spoke
//! when. Segments can be tagged as enumerator or respondent through an
//! [`EnumeratorRegistry`] and exported as JSON, RTTM or text.
//!
//! ```ignore
//! use std::sync::Arc;
//! use survey_diarize::{DiarizationPipeline, WavLoader};
//!
//! let pipeline = DiarizationPipeline::new(Arc::new(my_classifier));
//! let segments = pipeline.diarize_file("interview.wav", &WavLoader)?;
//! ```

mod audio;
mod classifier;
mod config;
mod error;
mod export;
mod pipeline;
mod refine;
mod registry;
mod segment;
mod smoothing;
mod stats;
mod wav;
mod window;

pub use audio::{AudioLoader, AudioSignal};
pub use classifier::{ClassifierPool, ClassifyOptions, SpeakerClassifier, SpeakerPrediction};
pub use config::DiarizationConfig;
pub use error::DiarizationError;
pub use export::{export_diarization, render_json, render_rttm, render_text, ExportFormat};
pub use pipeline::{save_speaker_segments, DiarizationPipeline, RealtimeResult, Stage};
pub use refine::{fill_gaps, filter_short_segments};
pub use registry::{EnumeratorList, EnumeratorRegistry, SpeakerRole};
pub use segment::{
    label_segments, merge_predictions, DiarizationSegment, LabeledSegment, WindowPrediction,
};
pub use smoothing::smooth_predictions;
pub use stats::{get_speaker_statistics, SpeakerStatistics};
pub use wav::{read_wav, write_wav, WavLoader};
pub use window::{extract_windows, Window, Windows};
