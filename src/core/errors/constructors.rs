//! Error constructor utilities for the triage pipeline.
//!
//! These helpers keep error construction terse at call sites and make sure a
//! given failure is always reported with the same shape.

use super::types::{OpaqueError, ProcessingStage, TriageError};

impl TriageError {
    /// Creates an `UnsupportedFormat` error.
    pub fn unsupported_format(detail: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            detail: detail.into(),
        }
    }

    /// Creates an `OversizeInput` error.
    pub fn oversize_input(size: usize, limit: usize) -> Self {
        Self::OversizeInput { size, limit }
    }

    /// Creates a `DuplicateModel` error.
    pub fn duplicate_model(disease_key: impl Into<String>) -> Self {
        Self::DuplicateModel {
            disease_key: disease_key.into(),
        }
    }

    /// Internal helper to build a Processing error with minimal boilerplate.
    #[inline]
    fn processing_with_context(
        stage: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a Processing error for the given stage.
    ///
    /// # Arguments
    ///
    /// * `stage` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        stage: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(stage, context, error)
    }

    /// Creates a Processing error for resize operations.
    pub fn resize_error(context: &str, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::processing_with_context(ProcessingStage::Resize, context, error)
    }

    /// Creates a Processing error for normalization operations.
    pub fn normalization(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::Normalization, context, error)
    }

    /// Creates a Processing error for a malformed model output vector.
    pub fn output_decoding_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::processing_with_context(
            ProcessingStage::OutputDecoding,
            message.clone(),
            OpaqueError(message),
        )
    }

    /// Creates a `ModelInference` error for the given model.
    ///
    /// # Arguments
    ///
    /// * `disease_key` - Disease key of the model that failed.
    /// * `context` - What the orchestrator was doing.
    /// * `error` - The underlying error.
    pub fn model_inference_error(
        disease_key: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelInference {
            disease_key: disease_key.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a `ModelInference` error with a plain message and no underlying cause.
    pub fn model_inference_message(disease_key: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::model_inference_error(disease_key, &message, OpaqueError(message.clone()))
    }

    /// Creates a `ReportGenerationUnavailable` error.
    pub fn report_unavailable(reason: impl Into<String>) -> Self {
        Self::ReportGenerationUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError`.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a `ConfigError` naming the offending field and value.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{field}' with value '{value}': {reason}"
            ),
        }
    }

    /// Creates a validation error naming the component and field.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidInput {
            message: format!(
                "Validation failed in {component}: field '{field}' expected {expected}, but got '{actual}'"
            ),
        }
    }

    /// Creates a `Persistence` error.
    pub fn persistence_error(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Creates an error for model load failures with an optional suggestion.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model artifact
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {s}"))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }
}
