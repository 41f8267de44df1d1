//! # Chest Triage
//!
//! Triage of chest radiographs with a set of independent disease classifiers.
//! An uploaded image is decoded, scored for quality and normalized once per
//! model input family. Every registered model then runs in isolation, their
//! outputs are reduced to a single primary diagnosis, and a structured report
//! is attached.
//!
//! ## Features
//!
//! - JPEG, PNG, BMP, TIFF and uncompressed DICOM-like uploads
//! - Bounded parallel inference with per-model deadlines and error isolation
//! - Deterministic aggregation ranked by each model's reported accuracy
//! - Optional generated report narrative with a deterministic template fallback
//! - ONNX Runtime models loaded from a JSON manifest (feature `onnx`)
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, the model registry and capability traits
//! * [`domain`] - Value types passed between stages and the disease knowledge table
//! * [`pipeline`] - The stages and the [`pipeline::TriagePipeline`] driving them
//! * [`processors`] - Decoding, resizing, normalization and quality heuristics
//! * [`utils`] - Upload reading and probability helpers
//!
//! ## Quick Start
//!
//! ```rust
//! use chest_triage::prelude::*;
//! use std::io::Cursor;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = ModelRegistry::new();
//! for descriptor in standard_descriptors() {
//!     let output = match descriptor.output {
//!         OutputActivation::Sigmoid => vec![0.12],
//!         _ => vec![0.90, 0.06, 0.04],
//!     };
//!     registry.register(descriptor, move |_: &ImageTensor| -> Result<Vec<f32>, TriageError> {
//!         Ok(output.clone())
//!     })?;
//! }
//!
//! let pipeline = TriagePipeline::builder().registry(registry).build()?;
//!
//! let image = image::RgbImage::from_fn(256, 256, |x, y| image::Rgb([(x ^ y) as u8; 3]));
//! let mut bytes = Vec::new();
//! image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
//!
//! let record = pipeline.analyze(&bytes)?;
//! assert_eq!(record.diagnosis.primary_diagnosis, "normal");
//! println!("{}", record.to_response_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### JSON Configuration
//!
//! ```rust
//! use chest_triage::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::from_json_str(r#"
//! {
//!   "inference": { "max_threads": 3, "model_timeout_ms": 5000 },
//!   "report": {
//!     "high_urgency_threshold": 0.85,
//!     "generation": { "enabled": false }
//!   }
//! }
//! "#)?;
//! assert_eq!(config.inference.max_threads, Some(3));
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;

pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use chest_triage::prelude::*;
/// ```
///
/// Included items cover building a registry, running the pipeline and reading
/// its results. Stage-level types live in [`crate::pipeline`].
pub mod prelude {
    // Pipeline (essential)
    pub use crate::pipeline::{
        MemorySink, PipelineStats, PredictionRecord, TriagePipeline, TriagePipelineBuilder,
    };

    // Models and configuration
    pub use crate::core::{
        DiseaseModel, ModelDescriptor, ModelRegistry, NarrativeGenerator, OutputActivation,
        PipelineConfig, PredictionSink, standard_descriptors,
    };
    #[cfg(feature = "onnx")]
    pub use crate::core::{OnnxDiseaseModel, load_registry_from_manifest};

    // Results
    pub use crate::domain::{AggregatedDiagnosis, ImageTensor, InputSpec, MedicalReport, Urgency};

    // Error Handling (essential)
    pub use crate::core::{TriageError, TriageResult};
}
