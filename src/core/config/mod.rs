//! Configuration management for the triage pipeline.
//!
//! A [`PipelineConfig`] groups the settings of every stage. Each section can
//! be built in code with `with_*` methods or loaded from JSON, where every
//! field is optional and falls back to its default.
//!
//! ```rust
//! use chest_triage::core::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{ "inference": { "model_timeout_ms": 2500 } }"#).unwrap();
//! assert_eq!(config.inference.model_timeout_ms, 2500);
//! assert_eq!(config.report.high_urgency_threshold, 0.8);
//! ```

pub mod parallel;
pub mod preprocess;
pub mod report;

pub use parallel::{InferencePolicy, OnnxThreadingConfig};
pub use preprocess::PreprocessConfig;
pub use report::{GenerationConfig, ReportConfig};

use crate::core::TriageError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upload handling.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// Model dispatch.
    #[serde(default)]
    pub inference: InferencePolicy,
    /// Report synthesis.
    #[serde(default)]
    pub report: ReportConfig,
}

impl PipelineConfig {
    /// Create a configuration with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preprocess section.
    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Set the inference section.
    pub fn with_inference(mut self, inference: InferencePolicy) -> Self {
        self.inference = inference;
        self
    }

    /// Set the report section.
    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }

    /// Parses a JSON configuration and clamps it.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the document is not valid JSON for this schema.
    pub fn from_json_str(json: &str) -> Result<Self, TriageError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            TriageError::config_error(format!("invalid pipeline configuration: {e}"))
        })?;
        Ok(config.clamped())
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the file when it cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TriageError::config_error_with_context(
                "path",
                &path.display().to_string(),
                &format!("cannot read configuration: {e}"),
            )
        })?;
        Self::from_json_str(&json)
    }

    /// Repairs out-of-range values in every section, logging a warning for each.
    pub fn clamped(self) -> Self {
        Self {
            preprocess: self.preprocess.clamped(),
            inference: self.inference.clamped(),
            report: self.report.clamped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_MAX_INPUT_BYTES;
    use crate::processors::ResizeFilter;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.preprocess.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
        assert_eq!(config.inference.max_threads, None);
        assert_eq!(config.inference.model_timeout_ms, 10_000);
        assert_eq!(config.report.medium_urgency_threshold, 0.5);
        assert!(!config.report.generation.enabled);
        assert_eq!(config.report.generation.model, "gemini-pro");
    }

    #[test]
    fn test_json_sections_override_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "preprocess": { "max_input_bytes": 1024, "resize_filter": "lanczos3" },
                "inference": { "max_threads": 2, "onnx_threading": { "intra_threads": 1 } },
                "report": { "generation": { "enabled": true, "timeout_ms": 1500 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.preprocess.max_input_bytes, 1024);
        assert_eq!(config.preprocess.resize_filter, ResizeFilter::Lanczos3);
        assert_eq!(config.inference.max_threads, Some(2));
        assert_eq!(config.inference.onnx_threading.intra_threads, Some(1));
        assert!(config.report.generation.enabled);
        assert_eq!(config.report.generation.timeout_ms, 1500);
        assert_eq!(config.report.generation.retry_backoff_ms, 250);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "inference": { "max_threads": 0, "model_timeout_ms": 0, "probability_tolerance": -1.0 },
                "report": { "high_urgency_threshold": 1.4, "medium_urgency_threshold": 0.9 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.inference.max_threads, Some(1));
        assert_eq!(config.inference.model_timeout_ms, 1);
        assert_eq!(config.inference.probability_tolerance, 1e-3);
        assert_eq!(config.report.high_urgency_threshold, 1.0);
        assert_eq!(config.report.medium_urgency_threshold, 0.9);

        let config = PipelineConfig::new()
            .with_report(ReportConfig::default().with_urgency_thresholds(0.9, 0.6))
            .clamped();
        assert_eq!(config.report.medium_urgency_threshold, 0.6);
    }

    #[test]
    fn test_invalid_json_is_a_config_error() {
        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TriageError::ConfigError { .. }));

        let err = PipelineConfig::from_json_file("/nonexistent/triage.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/triage.json"));
    }
}
