//! Constants used throughout the triage pipeline.

/// Maximum accepted upload size in bytes (16 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;

/// Label reported by a model for its negative class unless the descriptor says otherwise.
pub const NORMAL_LABEL: &str = "normal";

/// Top label carried by the sentinel output of a failed model call.
pub const ERROR_LABEL: &str = "error";

/// Primary diagnosis when no model fired.
pub const NORMAL_DIAGNOSIS: &str = "normal";

/// Default model input edge in pixels.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Default per-model call timeout in milliseconds.
pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 10_000;

/// Default tolerance on the sum of a probability vector.
pub const DEFAULT_PROBABILITY_TOLERANCE: f32 = 1e-3;

/// Confidence at or above which a positive finding is `High` urgency.
pub const DEFAULT_HIGH_URGENCY_THRESHOLD: f64 = 0.8;

/// Confidence at or above which a positive finding is `Medium` urgency.
pub const DEFAULT_MEDIUM_URGENCY_THRESHOLD: f64 = 0.5;

/// Quality score below which the report carries a quality note.
pub const DEFAULT_LOW_QUALITY_THRESHOLD: f64 = 50.0;

/// Smallest image edge considered full diagnostic resolution by the quality heuristic.
pub const MIN_DIAGNOSTIC_EDGE: u32 = 224;

/// Default hard timeout for one narrative generation call, in milliseconds.
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 4_000;

/// Default pause before the single narrative generation retry, in milliseconds.
pub const DEFAULT_GENERATION_RETRY_BACKOFF_MS: u64 = 250;

/// Environment variable holding the narrative generation API key by default.
pub const DEFAULT_GENERATION_API_KEY_ENV: &str = "TRIAGE_NLG_API_KEY";
