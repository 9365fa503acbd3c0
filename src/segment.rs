use crate::registry::{EnumeratorRegistry, SpeakerRole};
use serde::Serialize;
use std::fmt;

/// Speaker label for one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowPrediction {
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    pub speaker_id: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

/// A contiguous span attributed to one speaker.
///
/// Times are only changed through methods that keep `duration` equal to
/// `end_time - start_time`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiarizationSegment {
    start_time: f64,
    end_time: f64,
    duration: f64,
    speaker_id: String,
    confidence: f32,
}

impl DiarizationSegment {
    pub fn new(start_time: f64, end_time: f64, speaker_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            start_time,
            end_time,
            duration: end_time - start_time,
            speaker_id: speaker_id.into(),
            confidence,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn speaker_id(&self) -> &str {
        &self.speaker_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub(crate) fn set_end_time(&mut self, end_time: f64) {
        self.end_time = end_time;
        self.duration = self.end_time - self.start_time;
    }

    pub(crate) fn set_confidence(&mut self, confidence: f32) {
        self.confidence = confidence;
    }
}

impl fmt::Display for DiarizationSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Segment({:.2}s-{:.2}s, {}, conf={:.2})",
            self.start_time, self.end_time, self.speaker_id, self.confidence
        )
    }
}

/// Collapse runs of same-speaker predictions into segments.
///
/// A segment spans from its first window's start to its last window's end,
/// with the mean confidence of the run.
pub fn merge_predictions(predictions: &[WindowPrediction]) -> Vec<DiarizationSegment> {
    let Some(first) = predictions.first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut current = first;
    let mut end_time = first.end_time;
    let mut confidence_sum = first.confidence;
    let mut count = 1usize;

    for pred in &predictions[1..] {
        if pred.speaker_id == current.speaker_id {
            end_time = pred.end_time;
            confidence_sum += pred.confidence;
            count += 1;
        } else {
            segments.push(DiarizationSegment::new(
                current.start_time,
                end_time,
                current.speaker_id.clone(),
                confidence_sum / count as f32,
            ));
            current = pred;
            end_time = pred.end_time;
            confidence_sum = pred.confidence;
            count = 1;
        }
    }

    // Don't forget the last run
    segments.push(DiarizationSegment::new(
        current.start_time,
        end_time,
        current.speaker_id.clone(),
        confidence_sum / count as f32,
    ));
    segments
}

/// A finalized segment tagged with the interview role of its speaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSegment {
    #[serde(flatten)]
    pub segment: DiarizationSegment,
    pub role: SpeakerRole,
    /// Registered name when the speaker is an enumerator
    pub enumerator_name: Option<String>,
}

pub fn label_segments(
    segments: &[DiarizationSegment],
    registry: &dyn EnumeratorRegistry,
) -> Vec<LabeledSegment> {
    segments
        .iter()
        .map(|segment| {
            let role = registry.role_of(segment.speaker_id());
            let enumerator_name = match role {
                SpeakerRole::Enumerator => registry.enumerator_name(segment.speaker_id()),
                SpeakerRole::Respondent => None,
            };
            LabeledSegment {
                segment: segment.clone(),
                role,
                enumerator_name,
            }
        })
        .collect()
}
