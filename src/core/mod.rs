//! The core module of the triage pipeline.
//!
//! This module contains the fundamental components of the pipeline, including:
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling
//! - The model registry
//! - Traits for pluggable collaborators (models, narrative generation, persistence)
//! - ONNX Runtime integration (feature `onnx`)
//!
//! It also provides re-exports of commonly used types and functions for convenience.

pub mod config;
pub mod constants;
pub mod errors;
#[cfg(feature = "onnx")]
pub mod inference;
pub mod registry;
pub mod traits;
pub mod validation;

pub use config::{
    GenerationConfig, InferencePolicy, OnnxThreadingConfig, PipelineConfig, PreprocessConfig,
    ReportConfig,
};
pub use constants::*;
pub use errors::{ProcessingStage, TriageError, TriageResult};
#[cfg(feature = "onnx")]
pub use inference::{ModelManifest, OnnxDiseaseModel, load_registry_from_manifest, load_session};
pub use registry::{ModelDescriptor, ModelRegistry, ModelStatus, OutputActivation, standard_descriptors};
pub use traits::{DiseaseModel, Narrative, NarrativeGenerator, NarrativeRequest, PredictionSink};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
