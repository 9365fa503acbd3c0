//! Serialization of diarization results to JSON, RTTM and plain text.

use crate::error::DiarizationError;
use crate::segment::DiarizationSegment;
use crate::stats::{get_speaker_statistics, SpeakerStatistics};
use chrono::Local;
use eyre::Result;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Rttm,
    Text,
}

impl FromStr for ExportFormat {
    type Err = DiarizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "rttm" => Ok(ExportFormat::Rttm),
            "txt" | "text" => Ok(ExportFormat::Text),
            _ => Err(DiarizationError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Rttm => "rttm",
            ExportFormat::Text => "txt",
        })
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    segments: &'a [DiarizationSegment],
    statistics: BTreeMap<String, SpeakerStatistics>,
    total_segments: usize,
    export_time: String,
}

/// Full dump of segments and per-speaker statistics.
pub fn render_json(segments: &[DiarizationSegment]) -> Result<String> {
    let report = JsonReport {
        segments,
        statistics: get_speaker_statistics(segments),
        total_segments: segments.len(),
        export_time: Local::now().to_rfc3339(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// One `SPEAKER` line per segment, times and confidence to 3 decimals.
pub fn render_rttm(segments: &[DiarizationSegment], file_id: &str) -> String {
    segments
        .iter()
        .map(|s| {
            format!(
                "SPEAKER {} 1 {:.3} {:.3} <NA> <NA> {} {:.3}",
                file_id,
                s.start_time(),
                s.duration(),
                s.speaker_id(),
                s.confidence()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable segment list followed by a per-speaker summary.
pub fn render_text(segments: &[DiarizationSegment]) -> String {
    let rule = "=".repeat(50);
    let mut lines = vec![
        "Speaker Diarization Results".to_string(),
        rule.clone(),
        String::new(),
    ];

    for (i, s) in segments.iter().enumerate() {
        lines.push(format!(
            "{}. [{} - {}]",
            i + 1,
            format_time(s.start_time()),
            format_time(s.end_time())
        ));
        lines.push(format!("   Speaker: {}", s.speaker_id()));
        lines.push(format!("   Duration: {:.2}s", s.duration()));
        lines.push(format!("   Confidence: {:.2}", s.confidence()));
        lines.push(String::new());
    }

    lines.push(rule.clone());
    lines.push("Speaker Statistics".to_string());
    lines.push(rule);

    for (speaker_id, stats) in get_speaker_statistics(segments) {
        lines.push(String::new());
        lines.push(format!("Speaker: {speaker_id}"));
        lines.push(format!("  Total Duration: {:.2}s", stats.total_duration));
        lines.push(format!("  Number of Segments: {}", stats.segment_count));
        lines.push(format!("  Average Confidence: {:.2}", stats.avg_confidence));
    }

    lines.join("\n")
}

/// `MM:SS.mmm`
fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    let secs = seconds - minutes * 60.0;
    format!("{:02}:{:06.3}", minutes as u64, secs)
}

/// Write `segments` to `output_path` in `format`.
///
/// The segment list is only read; a failed write leaves it usable.
pub fn export_diarization(
    segments: &[DiarizationSegment],
    output_path: &Path,
    format: ExportFormat,
) -> Result<()> {
    let body = match format {
        ExportFormat::Json => render_json(segments)?,
        ExportFormat::Rttm => {
            let file_id = output_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            render_rttm(segments, &file_id)
        }
        ExportFormat::Text => render_text(segments),
    };

    write_file(output_path, body.as_bytes()).map_err(|source| DiarizationError::Export {
        path: output_path.to_path_buf(),
        source,
    })?;

    info!("Exported {} segments as {} to {}", segments.len(), format, output_path.display());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<DiarizationSegment> {
        vec![
            DiarizationSegment::new(0.0, 2.25, "enum_01", 0.91),
            DiarizationSegment::new(2.25, 65.5, "resp", 0.6),
        ]
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("RTTM".parse::<ExportFormat>().unwrap(), ExportFormat::Rttm);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!(matches!(
            "csv".parse::<ExportFormat>(),
            Err(DiarizationError::UnsupportedFormat(f)) if f == "csv"
        ));
    }

    #[test]
    fn test_rttm_lines() {
        let rttm = render_rttm(&segments(), "interview_42");
        let lines: Vec<&str> = rttm.lines().collect();
        assert_eq!(
            lines,
            vec![
                "SPEAKER interview_42 1 0.000 2.250 <NA> <NA> enum_01 0.910",
                "SPEAKER interview_42 1 2.250 63.250 <NA> <NA> resp 0.600",
            ]
        );
    }

    #[test]
    fn test_json_report() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&segments()).unwrap()).unwrap();
        assert_eq!(json["total_segments"], 2);
        assert_eq!(json["segments"][1]["speaker_id"], "resp");
        assert_eq!(json["segments"][1]["duration"], 63.25);
        assert_eq!(json["statistics"]["enum_01"]["segment_count"], 1);
        assert!(json["export_time"].is_string());
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&segments());
        assert!(text.starts_with("Speaker Diarization Results\n"));
        assert!(text.contains("2. [00:02.250 - 01:05.500]"));
        assert!(text.contains("   Speaker: resp"));
        assert!(text.contains("  Number of Segments: 1"));
        assert!(text.ends_with(
            "Speaker: resp\n  Total Duration: 63.25s\n  Number of Segments: 1\n  \
             Average Confidence: 0.60"
        ));
    }

    #[test]
    fn test_text_report_without_segments() {
        let rule = "=".repeat(50);
        assert_eq!(
            render_text(&[]),
            format!("Speaker Diarization Results\n{rule}\n\n{rule}\nSpeaker Statistics\n{rule}")
        );
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(65.5), "01:05.500");
        assert_eq!(format_time(600.25), "10:00.250");
    }

    #[test]
    fn test_export_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interview_42.rttm");
        export_diarization(&segments(), &path, ExportFormat::Rttm).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("SPEAKER interview_42 1 0.000"));
        assert_eq!(written.lines().count(), 2);
    }

    #[test]
    fn test_export_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let segments = segments();
        let err = export_diarization(&segments, &path, ExportFormat::Json).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DiarizationError>(),
            Some(DiarizationError::Export { .. })
        ));
        assert_eq!(segments.len(), 2);
    }
}
