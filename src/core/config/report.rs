//! Report synthesis configuration.

use crate::core::validation::{clamp_min_millis, clamp_unit_threshold};
use crate::core::{
    DEFAULT_GENERATION_API_KEY_ENV, DEFAULT_GENERATION_RETRY_BACKOFF_MS,
    DEFAULT_GENERATION_TIMEOUT_MS, DEFAULT_HIGH_URGENCY_THRESHOLD, DEFAULT_LOW_QUALITY_THRESHOLD,
    DEFAULT_MEDIUM_URGENCY_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Urgency bands, quality note threshold and narrative generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Confidence at or above which a positive diagnosis is `High`.
    /// Default: 0.8
    #[serde(default = "ReportConfig::default_high_urgency_threshold")]
    pub high_urgency_threshold: f64,

    /// Confidence at or above which a positive diagnosis is `Medium`.
    /// Default: 0.5
    #[serde(default = "ReportConfig::default_medium_urgency_threshold")]
    pub medium_urgency_threshold: f64,

    /// Quality score below which the report carries a quality note.
    /// Default: 50
    #[serde(default = "ReportConfig::default_low_quality_threshold")]
    pub low_quality_threshold: f64,

    /// External narrative generation.
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl ReportConfig {
    /// Set the urgency bands.
    pub fn with_urgency_thresholds(mut self, medium: f64, high: f64) -> Self {
        self.medium_urgency_threshold = medium;
        self.high_urgency_threshold = high;
        self
    }

    /// Set the quality note threshold.
    pub fn with_low_quality_threshold(mut self, threshold: f64) -> Self {
        self.low_quality_threshold = threshold;
        self
    }

    /// Set the generation settings.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Repairs out-of-range values, logging a warning for each.
    ///
    /// Thresholds are clamped into `[0, 1]`; a medium band above the high band
    /// is lowered to the high band.
    pub fn clamped(mut self) -> Self {
        self.high_urgency_threshold =
            clamp_unit_threshold(self.high_urgency_threshold, "report.high_urgency_threshold");
        self.medium_urgency_threshold =
            clamp_unit_threshold(self.medium_urgency_threshold, "report.medium_urgency_threshold");
        if self.medium_urgency_threshold > self.high_urgency_threshold {
            warn!(
                "report.medium_urgency_threshold {} exceeds high threshold {}; using {}",
                self.medium_urgency_threshold,
                self.high_urgency_threshold,
                self.high_urgency_threshold
            );
            self.medium_urgency_threshold = self.high_urgency_threshold;
        }
        if !self.low_quality_threshold.is_finite() {
            warn!("report.low_quality_threshold is not finite; using {DEFAULT_LOW_QUALITY_THRESHOLD}");
            self.low_quality_threshold = DEFAULT_LOW_QUALITY_THRESHOLD;
        }
        self.low_quality_threshold = self.low_quality_threshold.clamp(0.0, 100.0);
        self.generation = self.generation.clamped();
        self
    }

    fn default_high_urgency_threshold() -> f64 {
        DEFAULT_HIGH_URGENCY_THRESHOLD
    }

    fn default_medium_urgency_threshold() -> f64 {
        DEFAULT_MEDIUM_URGENCY_THRESHOLD
    }

    fn default_low_quality_threshold() -> f64 {
        DEFAULT_LOW_QUALITY_THRESHOLD
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            high_urgency_threshold: Self::default_high_urgency_threshold(),
            medium_urgency_threshold: Self::default_medium_urgency_threshold(),
            low_quality_threshold: Self::default_low_quality_threshold(),
            generation: GenerationConfig::default(),
        }
    }
}

/// Settings for the external narrative generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Whether to call the generator at all.
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the generation API.
    #[serde(default = "GenerationConfig::default_base_url")]
    pub base_url: String,

    /// Model identifier sent to the service.
    /// Default: gemini-pro
    #[serde(default = "GenerationConfig::default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    /// Default: TRIAGE_NLG_API_KEY
    #[serde(default = "GenerationConfig::default_api_key_env")]
    pub api_key_env: String,

    /// Hard deadline for one call in milliseconds.
    /// Default: 4000
    #[serde(default = "GenerationConfig::default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause before the single retry in milliseconds.
    /// Default: 250
    #[serde(default = "GenerationConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl GenerationConfig {
    /// Enable or disable generation.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API key environment variable.
    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = name.into();
        self
    }

    /// Set the call deadline.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the retry backoff.
    pub fn with_retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.retry_backoff_ms = backoff_ms;
        self
    }

    /// Repairs out-of-range values, logging a warning for each.
    pub fn clamped(mut self) -> Self {
        self.timeout_ms = clamp_min_millis(self.timeout_ms, "report.generation.timeout_ms");
        self
    }

    fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_string()
    }

    fn default_model() -> String {
        "gemini-pro".to_string()
    }

    fn default_api_key_env() -> String {
        DEFAULT_GENERATION_API_KEY_ENV.to_string()
    }

    fn default_timeout_ms() -> u64 {
        DEFAULT_GENERATION_TIMEOUT_MS
    }

    fn default_retry_backoff_ms() -> u64 {
        DEFAULT_GENERATION_RETRY_BACKOFF_MS
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key_env: Self::default_api_key_env(),
            timeout_ms: Self::default_timeout_ms(),
            retry_backoff_ms: Self::default_retry_backoff_ms(),
        }
    }
}
