//! JSON model manifests.

use crate::core::config::OnnxThreadingConfig;
use crate::core::inference::OnnxDiseaseModel;
use crate::core::registry::{ModelDescriptor, ModelRegistry};
use crate::core::TriageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One model entry of a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Registry descriptor.
    pub descriptor: ModelDescriptor,
    /// ONNX file, relative paths resolve against the manifest's directory.
    pub model_path: PathBuf,
    /// Input tensor name; the session's first input when absent.
    #[serde(default)]
    pub input_name: Option<String>,
    /// Output tensor name; the session's first output when absent.
    #[serde(default)]
    pub output_name: Option<String>,
}

/// The list of models to register, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Model entries.
    pub models: Vec<ManifestEntry>,
}

impl ModelManifest {
    /// Reads a manifest, resolving relative model paths against its directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TriageError::config_error_with_context(
                "manifest",
                &path.display().to_string(),
                &format!("cannot read manifest: {e}"),
            )
        })?;
        let mut manifest: Self = serde_json::from_str(&json).map_err(|e| {
            TriageError::config_error(format!("invalid model manifest {}: {e}", path.display()))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for entry in &mut manifest.models {
            if entry.model_path.is_relative() {
                entry.model_path = base.join(&entry.model_path);
            }
        }
        Ok(manifest)
    }
}

/// Loads every model of a manifest into a new registry.
pub fn load_registry_from_manifest(
    path: impl AsRef<Path>,
    threading: &OnnxThreadingConfig,
) -> Result<ModelRegistry, TriageError> {
    let manifest = ModelManifest::from_json_file(path)?;
    let mut registry = ModelRegistry::new();
    for entry in manifest.models {
        let model = OnnxDiseaseModel::load(
            entry.descriptor.disease_key.clone(),
            &entry.model_path,
            entry.input_name.as_deref(),
            entry.output_name.as_deref(),
            threading,
        )?;
        info!(
            disease_key = %entry.descriptor.disease_key,
            path = %entry.model_path.display(),
            "loaded ONNX model"
        );
        registry.register(entry.descriptor, model)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_manifest_resolves_relative_paths() {
        let dir = std::env::temp_dir().join(format!("chest-triage-manifest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("models.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"{"models":[{"descriptor":{"disease_key":"pneumonia","class_labels":["normal","pneumonia"],"reported_accuracy":0.942,"output":"sigmoid"},"model_path":"pneumonia.onnx"}]}"#,
        )
        .unwrap();

        let manifest = ModelManifest::from_json_file(&path).unwrap();
        assert_eq!(manifest.models[0].model_path, dir.join("pneumonia.onnx"));
        assert_eq!(manifest.models[0].input_name, None);

        let err = load_registry_from_manifest(&path, &OnnxThreadingConfig::default()).unwrap_err();
        assert!(matches!(err, TriageError::ModelLoad { .. }));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
