use crate::segment::DiarizationSegment;
use log::debug;

/// Drop segments shorter than `min_duration` by absorbing them into the
/// previous kept segment, whose end is pushed forward over the short span.
///
/// A short segment with no kept predecessor is dropped outright. When a
/// kept segment continues the previous kept speaker and touches or overlaps
/// it, the two are coalesced with a duration-weighted confidence.
pub fn filter_short_segments(
    segments: Vec<DiarizationSegment>,
    min_duration: f64,
) -> Vec<DiarizationSegment> {
    let mut kept: Vec<DiarizationSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        let Some(prev) = kept.last_mut() else {
            if segment.duration() >= min_duration {
                kept.push(segment);
            } else {
                debug!("Dropping leading short segment {}", segment);
            }
            continue;
        };

        if segment.duration() < min_duration {
            if segment.end_time() > prev.end_time() {
                prev.set_end_time(segment.end_time());
            }
            continue;
        }

        if segment.speaker_id() == prev.speaker_id() && segment.start_time() <= prev.end_time() {
            let prev_weight = prev.duration();
            let added = segment.end_time() - prev.end_time();
            if added > 0.0 {
                let total = prev_weight + added;
                let confidence = if total > 0.0 {
                    ((prev.confidence() as f64 * prev_weight + segment.confidence() as f64 * added)
                        / total) as f32
                } else {
                    prev.confidence()
                };
                prev.set_end_time(segment.end_time());
                prev.set_confidence(confidence);
            }
            continue;
        }

        kept.push(segment);
    }

    kept
}

/// Close gaps narrower than `gap_threshold` by moving each previous
/// segment's end to the next segment's start.
///
/// Overlaps count as negative gaps, so they are trimmed the same way. The
/// later segment is never altered. Gaps of at least `gap_threshold` are kept
/// as silence.
pub fn fill_gaps(mut segments: Vec<DiarizationSegment>, gap_threshold: f64) -> Vec<DiarizationSegment> {
    for i in 1..segments.len() {
        let next_start = segments[i].start_time();
        let prev = &mut segments[i - 1];
        let gap = next_start - prev.end_time();
        if gap < gap_threshold {
            prev.set_end_time(next_start);
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, speaker: &str) -> DiarizationSegment {
        DiarizationSegment::new(start, end, speaker, 0.8)
    }

    fn spans(segments: &[DiarizationSegment]) -> Vec<(f64, f64, &str)> {
        segments
            .iter()
            .map(|s| (s.start_time(), s.end_time(), s.speaker_id()))
            .collect()
    }

    #[test]
    fn test_short_segment_absorbed_into_predecessor() {
        let segments = vec![seg(0.0, 1.0, "A"), seg(1.0, 1.2, "B"), seg(1.2, 5.0, "A")];
        let filtered = filter_short_segments(segments, 0.5);

        assert_eq!(spans(&filtered), vec![(0.0, 5.0, "A")]);
        assert_eq!(filtered[0].duration(), 5.0);
        assert!((filtered[0].confidence() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_absorption_keeps_different_speakers_apart() {
        let segments = vec![seg(0.0, 2.0, "A"), seg(2.0, 2.3, "B"), seg(2.3, 5.0, "C")];
        let filtered = filter_short_segments(segments, 0.5);
        assert_eq!(spans(&filtered), vec![(0.0, 2.3, "A"), (2.3, 5.0, "C")]);
    }

    #[test]
    fn test_leading_short_segment_is_dropped() {
        let segments = vec![seg(0.0, 0.3, "B"), seg(0.3, 4.0, "A")];
        let filtered = filter_short_segments(segments, 0.5);
        assert_eq!(spans(&filtered), vec![(0.3, 4.0, "A")]);
    }

    #[test]
    fn test_all_short_segments_leave_nothing() {
        let segments = vec![seg(0.0, 0.2, "A"), seg(0.2, 0.4, "B")];
        assert!(filter_short_segments(segments, 0.5).is_empty());
    }

    #[test]
    fn test_same_speaker_after_gap_is_not_coalesced() {
        let segments = vec![seg(0.0, 2.0, "A"), seg(2.0, 2.2, "B"), seg(3.0, 5.0, "A")];
        let filtered = filter_short_segments(segments, 0.5);
        assert_eq!(spans(&filtered), vec![(0.0, 2.2, "A"), (3.0, 5.0, "A")]);
    }

    #[test]
    fn test_coalesced_confidence_is_duration_weighted() {
        let segments = vec![
            DiarizationSegment::new(0.0, 1.0, "A", 1.0),
            DiarizationSegment::new(1.0, 1.2, "B", 0.2),
            DiarizationSegment::new(1.2, 2.0, "A", 0.5),
        ];
        let filtered = filter_short_segments(segments, 0.5);
        assert_eq!(filtered.len(), 1);
        // 1.2s at 1.0 and 0.8s at 0.5
        assert!((filtered[0].confidence() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_small_gap_is_closed() {
        let segments = vec![seg(0.0, 2.0, "A"), seg(2.2, 4.0, "B")];
        let filled = fill_gaps(segments, 0.3);

        assert_eq!(spans(&filled), vec![(0.0, 2.2, "A"), (2.2, 4.0, "B")]);
        assert_eq!(filled[0].duration(), 2.2);
        assert_eq!(filled[1].duration(), 4.0 - 2.2);
    }

    #[test]
    fn test_large_gap_is_kept() {
        let segments = vec![seg(0.0, 2.0, "A"), seg(2.5, 4.0, "B")];
        let filled = fill_gaps(segments, 0.3);
        assert_eq!(spans(&filled), vec![(0.0, 2.0, "A"), (2.5, 4.0, "B")]);
    }

    #[test]
    fn test_overlap_is_trimmed() {
        let segments = vec![seg(0.0, 5.5, "A"), seg(3.0, 8.0, "B"), seg(6.0, 9.0, "A")];
        let filled = fill_gaps(segments, 0.3);
        assert_eq!(
            spans(&filled),
            vec![(0.0, 3.0, "A"), (3.0, 6.0, "B"), (6.0, 9.0, "A")]
        );
    }

    #[test]
    fn test_fill_gaps_is_idempotent() {
        let segments = vec![
            seg(0.0, 1.0, "A"),
            seg(1.1, 2.0, "B"),
            seg(2.9, 4.0, "A"),
            seg(3.5, 6.0, "C"),
            seg(6.29, 7.0, "B"),
        ];
        let once = fill_gaps(segments, 0.3);
        let twice = fill_gaps(once.clone(), 0.3);
        assert_eq!(once, twice);

        for pair in once.windows(2) {
            let gap = pair[1].start_time() - pair[0].end_time();
            assert!(gap == 0.0 || gap >= 0.3, "gap {gap} left open");
        }
        for s in &once {
            assert_eq!(s.duration(), s.end_time() - s.start_time());
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_short_segments(vec![], 0.5).is_empty());
        assert!(fill_gaps(vec![], 0.3).is_empty());
    }
}
