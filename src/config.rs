use crate::classifier::ClassifyOptions;
use crate::error::DiarizationError;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for a diarization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarizationConfig {
    /// Analysis window length in seconds
    pub window_duration: f64,
    /// Stride between window starts in seconds
    pub hop_duration: f64,
    /// Number of predictions in the majority-vote neighborhood
    pub smoothing_window: usize,
    /// Segments shorter than this are absorbed into their predecessor
    pub min_segment_duration: f64,
    /// Silences shorter than this are closed
    pub gap_threshold: f64,
    /// Maximum concurrent classifier calls
    pub max_workers: usize,
    /// Per-window classifier timeout in milliseconds
    pub classify_timeout_ms: Option<u64>,
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self {
            window_duration: 3.5,
            hop_duration: 1.0,
            smoothing_window: 3,
            min_segment_duration: 0.5,
            gap_threshold: 0.3,
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            classify_timeout_ms: Some(30_000),
        }
    }
}

impl DiarizationConfig {
    /// Load from a JSON file; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("malformed config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DiarizationError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DiarizationError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        };
        let non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(DiarizationError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )))
            }
        };

        positive("window_duration", self.window_duration)?;
        positive("hop_duration", self.hop_duration)?;
        non_negative("min_segment_duration", self.min_segment_duration)?;
        non_negative("gap_threshold", self.gap_threshold)?;
        if self.max_workers == 0 {
            return Err(DiarizationError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            max_workers: self.max_workers,
            timeout: self.classify_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiarizationConfig::default();
        assert_eq!(config.window_duration, 3.5);
        assert_eq!(config.hop_duration, 1.0);
        assert_eq!(config.smoothing_window, 3);
        assert_eq!(config.min_segment_duration, 0.5);
        assert_eq!(config.gap_threshold, 0.3);
        assert!(config.max_workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diarization.json");
        std::fs::write(&path, r#"{"gap_threshold": 0.2, "classify_timeout_ms": null}"#).unwrap();

        let config = DiarizationConfig::from_json_file(&path).unwrap();
        assert_eq!(config.gap_threshold, 0.2);
        assert_eq!(config.window_duration, 3.5);
        assert_eq!(config.classify_options().timeout, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diarization.json");
        std::fs::write(&path, r#"{"hop_duration": 0.0}"#).unwrap();

        let err = DiarizationConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DiarizationError>(),
            Some(DiarizationError::InvalidConfig(_))
        ));

        let config = DiarizationConfig {
            max_workers: 0,
            ..DiarizationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DiarizationConfig {
            gap_threshold: -0.1,
            ..DiarizationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_classify_options() {
        let config = DiarizationConfig {
            max_workers: 3,
            classify_timeout_ms: Some(250),
            ..DiarizationConfig::default()
        };
        let options = config.classify_options();
        assert_eq!(options.max_workers, 3);
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
    }
}
