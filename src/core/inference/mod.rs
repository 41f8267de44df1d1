//! ONNX Runtime integration.
//!
//! Available with the `onnx` feature. [`OnnxDiseaseModel`] adapts one ONNX
//! session to the [`DiseaseModel`](crate::core::traits::DiseaseModel) trait, and
//! [`load_registry_from_manifest`] builds a registry from a JSON manifest.

mod manifest;
mod model;
mod session;

pub use manifest::{ManifestEntry, ModelManifest, load_registry_from_manifest};
pub use model::OnnxDiseaseModel;
pub use session::load_session;
