use crate::segment::DiarizationSegment;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-speaker totals over a segment list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerStatistics {
    pub total_duration: f64,
    pub segment_count: usize,
    pub avg_confidence: f32,
    pub min_confidence: f32,
    pub max_confidence: f32,
}

#[derive(Default)]
struct Totals {
    duration: f64,
    count: usize,
    confidence_sum: f32,
    min_confidence: f32,
    max_confidence: f32,
}

/// Aggregate segments by speaker id, ordered by id.
pub fn get_speaker_statistics(
    segments: &[DiarizationSegment],
) -> BTreeMap<String, SpeakerStatistics> {
    let mut totals: BTreeMap<&str, Totals> = BTreeMap::new();

    for segment in segments {
        let confidence = segment.confidence();
        let entry = totals.entry(segment.speaker_id()).or_insert(Totals {
            min_confidence: confidence,
            max_confidence: confidence,
            ..Default::default()
        });
        entry.duration += segment.duration();
        entry.count += 1;
        entry.confidence_sum += confidence;
        entry.min_confidence = entry.min_confidence.min(confidence);
        entry.max_confidence = entry.max_confidence.max(confidence);
    }

    totals
        .into_iter()
        .map(|(speaker_id, t)| {
            let stats = SpeakerStatistics {
                total_duration: t.duration,
                segment_count: t.count,
                avg_confidence: t.confidence_sum / t.count as f32,
                min_confidence: t.min_confidence,
                max_confidence: t.max_confidence,
            };
            (speaker_id.to_string(), stats)
        })
        .collect()
}
