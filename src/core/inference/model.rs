//! ONNX-backed disease classifier.

use crate::core::TriageError;
use crate::core::config::OnnxThreadingConfig;
use crate::core::inference::load_session;
use crate::core::traits::DiseaseModel;
use crate::domain::ImageTensor;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A classifier running one ONNX session.
///
/// The session is guarded by a mutex; concurrent callers of the same model
/// take turns, while different models run in parallel.
pub struct OnnxDiseaseModel {
    disease_key: String,
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxDiseaseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDiseaseModel")
            .field("disease_key", &self.disease_key)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl OnnxDiseaseModel {
    /// Loads a model; missing tensor names are taken from the session's first
    /// input and output.
    pub fn load(
        disease_key: impl Into<String>,
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
        output_name: Option<&str>,
        threading: &OnnxThreadingConfig,
    ) -> Result<Self, TriageError> {
        let path = model_path.as_ref();
        let session = load_session(path, threading)?;

        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or_else(|| {
                    TriageError::model_load_error(path, "model declares no inputs", None, None::<std::io::Error>)
                })?,
        };
        let output_name = match output_name {
            Some(name) => name.to_string(),
            None => session
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or_else(|| {
                    TriageError::model_load_error(path, "model declares no outputs", None, None::<std::io::Error>)
                })?,
        };

        Ok(Self {
            disease_key: disease_key.into(),
            session: Mutex::new(session),
            input_name,
            output_name,
            model_path: path.to_path_buf(),
        })
    }

    /// Returns the model path associated with this model.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl DiseaseModel for OnnxDiseaseModel {
    fn infer(&self, input: &ImageTensor) -> Result<Vec<f32>, TriageError> {
        let tensor = TensorRef::from_array_view(input.data().view()).map_err(|e| {
            TriageError::model_inference_error(&self.disease_key, "tensor_conversion", e)
        })?;

        let mut session = self.session.lock().map_err(|_| {
            TriageError::model_inference_message(&self.disease_key, "session lock poisoned")
        })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| TriageError::model_inference_error(&self.disease_key, "forward_pass", e))?;

        let (_shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                TriageError::model_inference_error(&self.disease_key, "output_extraction", e)
            })?;

        Ok(data.to_vec())
    }
}
