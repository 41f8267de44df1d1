//! Helpers for working directly with ONNX Runtime sessions.

use crate::core::config::OnnxThreadingConfig;
use crate::core::errors::TriageError;
use ort::logging::LogLevel;
use ort::session::Session;
use std::path::Path;

/// Opens an ONNX model with the given threading settings.
///
/// # Errors
///
/// Returns a `ModelLoad` error naming the file when the session cannot be built.
pub fn load_session(
    model_path: impl AsRef<Path>,
    threading: &OnnxThreadingConfig,
) -> Result<Session, TriageError> {
    let path = model_path.as_ref();
    if !path.is_file() {
        return Err(TriageError::model_load_error(
            path,
            "file not found",
            Some("check the model_path entries of the manifest"),
            None::<std::io::Error>,
        ));
    }

    let mut builder = Session::builder()?.with_log_level(LogLevel::Error)?;
    if let Some(intra) = threading.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = threading.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }

    builder.commit_from_file(path).map_err(|e| {
        TriageError::model_load_error(
            path,
            "failed to create ONNX session",
            Some("verify model file exists and is readable"),
            Some(e),
        )
    })
}
