//! Inference dispatch configuration.

use crate::core::{DEFAULT_MODEL_TIMEOUT_MS, DEFAULT_PROBABILITY_TOLERANCE};
use crate::core::validation::{clamp_min_millis, clamp_min_size};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How per-model calls are dispatched and judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferencePolicy {
    /// Maximum number of worker threads for model calls.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    /// Default: None (use rayon's default)
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Per-call timeout in milliseconds, measured from when the call starts.
    /// Default: 10000
    #[serde(default = "InferencePolicy::default_model_timeout_ms")]
    pub model_timeout_ms: u64,

    /// Allowed deviation of a probability vector's sum from 1.
    /// Default: 1e-3
    #[serde(default = "InferencePolicy::default_probability_tolerance")]
    pub probability_tolerance: f32,

    /// ONNX Runtime threading configuration
    #[serde(default)]
    pub onnx_threading: OnnxThreadingConfig,
}

/// ONNX Runtime threading configuration applied to every model session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OnnxThreadingConfig {
    /// Number of threads used to parallelize execution within nodes.
    /// If None, uses ONNX Runtime default.
    #[serde(default)]
    pub intra_threads: Option<usize>,

    /// Number of threads used to parallelize execution across nodes.
    /// If None, uses ONNX Runtime default.
    #[serde(default)]
    pub inter_threads: Option<usize>,
}

impl OnnxThreadingConfig {
    /// Set the intra-op threads.
    pub fn with_intra_threads(mut self, threads: Option<usize>) -> Self {
        self.intra_threads = threads;
        self
    }

    /// Set the inter-op threads.
    pub fn with_inter_threads(mut self, threads: Option<usize>) -> Self {
        self.inter_threads = threads;
        self
    }
}

impl InferencePolicy {
    /// Create a new InferencePolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the per-call timeout.
    pub fn with_model_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.model_timeout_ms = timeout_ms;
        self
    }

    /// Set the probability sum tolerance.
    pub fn with_probability_tolerance(mut self, tolerance: f32) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    /// Set the ONNX threading configuration.
    pub fn with_onnx_threading(mut self, config: OnnxThreadingConfig) -> Self {
        self.onnx_threading = config;
        self
    }

    /// Repairs out-of-range values, logging a warning for each.
    pub fn clamped(mut self) -> Self {
        self.max_threads = self
            .max_threads
            .map(|threads| clamp_min_size(threads, "inference.max_threads"));
        self.model_timeout_ms = clamp_min_millis(self.model_timeout_ms, "inference.model_timeout_ms");
        if !(self.probability_tolerance.is_finite() && self.probability_tolerance >= 0.0) {
            warn!(
                "inference.probability_tolerance {} is invalid; using {}",
                self.probability_tolerance, DEFAULT_PROBABILITY_TOLERANCE
            );
            self.probability_tolerance = DEFAULT_PROBABILITY_TOLERANCE;
        }
        self
    }

    fn default_model_timeout_ms() -> u64 {
        DEFAULT_MODEL_TIMEOUT_MS
    }

    fn default_probability_tolerance() -> f32 {
        DEFAULT_PROBABILITY_TOLERANCE
    }
}

impl Default for InferencePolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            model_timeout_ms: Self::default_model_timeout_ms(),
            probability_tolerance: Self::default_probability_tolerance(),
            onnx_threading: OnnxThreadingConfig::default(),
        }
    }
}
