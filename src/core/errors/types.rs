//! Error types for the triage pipeline.
//!
//! Only [`TriageError::UnsupportedFormat`] and [`TriageError::OversizeInput`] ever
//! reach a caller of [`crate::pipeline::TriagePipeline::analyze`]. Inference and
//! report-generation errors are absorbed by the pipeline and surface as data
//! (error sentinels, a fallback source tag).

use thiserror::Error;

/// Stage of the pipeline in which a processing error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Byte-signature sniffing and image decoding.
    Decode,
    /// Aspect-preserving resize and center crop.
    Resize,
    /// Pixel scaling into the model's numeric range.
    Normalization,
    /// Image quality heuristics.
    QualityAssessment,
    /// Conversion of a raw model output vector into class probabilities.
    OutputDecoding,
    /// Report narrative assembly.
    ReportSynthesis,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Decode => write!(f, "decode"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::QualityAssessment => write!(f, "quality assessment"),
            ProcessingStage::OutputDecoding => write!(f, "output decoding"),
            ProcessingStage::ReportSynthesis => write!(f, "report synthesis"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// A string-backed error used as the `source` of wrapped errors when no
/// underlying error value exists.
#[derive(Debug, Clone)]
pub struct OpaqueError(pub String);

impl std::fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for OpaqueError {}

/// Errors produced by the triage pipeline and its components.
#[derive(Error, Debug)]
pub enum TriageError {
    /// The uploaded bytes are not one of the accepted formats, or failed to decode.
    #[error("unsupported format: {detail}")]
    UnsupportedFormat {
        /// What was wrong with the byte stream.
        detail: String,
    },

    /// The upload exceeds the configured size limit.
    #[error("input of {size} bytes exceeds the {limit} byte limit")]
    OversizeInput {
        /// Size of the rejected upload in bytes.
        size: usize,
        /// Configured maximum in bytes.
        limit: usize,
    },

    /// A model with the same disease key is already registered.
    #[error("a model for '{disease_key}' is already registered")]
    DuplicateModel {
        /// The conflicting disease key.
        disease_key: String,
    },

    /// A single model call failed.
    #[error("inference failed for model '{disease_key}': {context}")]
    ModelInference {
        /// Disease key of the failing model.
        disease_key: String,
        /// What the orchestrator was doing when the failure happened.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The external narrative generation service could not produce a report.
    #[error("report generation unavailable: {reason}")]
    ReportGenerationUnavailable {
        /// Why the service could not be used.
        reason: String,
    },

    /// Error occurred during processing.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// The persistence collaborator rejected a record.
    #[error("persistence: {message}")]
    Persistence {
        /// A message describing the failure.
        message: String,
    },

    /// Error loading a model artifact.
    #[error("failed to load model from '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path of the artifact.
        model_path: String,
        /// Short reason.
        reason: String,
        /// Optional suggestion, pre-formatted with a leading separator.
        suggestion: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from tensor shape operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error from JSON (de)serialization.
    #[error("json")]
    Json(#[from] serde_json::Error),

    /// Error from the HTTP client.
    #[error("http")]
    Http(#[from] reqwest::Error),

    /// Error from the ONNX Runtime session.
    #[cfg(feature = "onnx")]
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl TriageError {
    /// Whether the error aborts a triage request.
    ///
    /// Terminal errors are the preprocessing rejections; everything else is
    /// degraded into data by the pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TriageError::UnsupportedFormat { .. } | TriageError::OversizeInput { .. }
        )
    }
}
