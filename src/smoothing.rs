use crate::segment::WindowPrediction;
use std::collections::BTreeMap;

/// Majority-vote filter over the speaker label stream.
///
/// Each prediction is relabeled with the most frequent speaker among its
/// `window_size / 2` neighbors on either side (clipped at the ends), and
/// takes the mean confidence of that speaker's votes. Times are unchanged.
///
/// Ties go to the speaker with the higher mean confidence, then to the
/// lexicographically smaller id.
///
/// Input shorter than `window_size`, or carrying a single speaker, is
/// returned unchanged.
pub fn smooth_predictions(
    predictions: &[WindowPrediction],
    window_size: usize,
) -> Vec<WindowPrediction> {
    if predictions.len() < window_size || single_speaker(predictions) {
        return predictions.to_vec();
    }

    let half = window_size / 2;
    predictions
        .iter()
        .enumerate()
        .map(|(i, pred)| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(predictions.len());
            let Some((speaker_id, confidence)) = majority(&predictions[start..end]) else {
                return pred.clone();
            };
            WindowPrediction {
                start_time: pred.start_time,
                end_time: pred.end_time,
                speaker_id: speaker_id.to_string(),
                confidence,
            }
        })
        .collect()
}

fn single_speaker(predictions: &[WindowPrediction]) -> bool {
    predictions
        .windows(2)
        .all(|pair| pair[0].speaker_id == pair[1].speaker_id)
}

/// Winning speaker of a neighborhood and the mean confidence of its votes.
fn majority(neighborhood: &[WindowPrediction]) -> Option<(&str, f32)> {
    let mut tally: BTreeMap<&str, (usize, f32)> = BTreeMap::new();
    for pred in neighborhood {
        let entry = tally.entry(pred.speaker_id.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += pred.confidence;
    }

    // Ascending id order, so only a strictly better candidate replaces the best.
    let mut best: Option<(&str, usize, f32)> = None;
    for (speaker_id, (count, sum)) in tally {
        let mean = sum / count as f32;
        let better = match best {
            None => true,
            Some((_, best_count, best_mean)) => {
                count > best_count || (count == best_count && mean > best_mean)
            }
        };
        if better {
            best = Some((speaker_id, count, mean));
        }
    }
    best.map(|(speaker_id, _, mean)| (speaker_id, mean))
}
