//! The image preprocessor stage.
//!
//! Turns raw upload bytes into one tensor per distinct model input family,
//! plus an advisory quality assessment computed once on the decoded image.

use crate::core::config::PreprocessConfig;
use crate::core::registry::ModelDescriptor;
use crate::core::TriageError;
use crate::domain::{ImageTensor, InputSpec};
use crate::processors::{
    NormalizeImage, QualityAssessment, ResizeCrop, SourceFormat, assess_quality, decode_image,
};
use std::sync::Arc;
use tracing::debug;

/// Tensors prepared for one upload.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    tensors: Vec<Arc<ImageTensor>>,
    /// Advisory quality of the decoded upload.
    pub quality: QualityAssessment,
    /// Format detected from the byte signature.
    pub source_format: SourceFormat,
}

impl PreparedImage {
    /// Assembles a prepared image from existing tensors.
    pub fn new(
        tensors: Vec<Arc<ImageTensor>>,
        quality: QualityAssessment,
        source_format: SourceFormat,
    ) -> Self {
        Self {
            tensors,
            quality,
            source_format,
        }
    }

    /// The tensor prepared for `spec`, shared among models of that family.
    pub fn tensor_for(&self, spec: &InputSpec) -> Option<Arc<ImageTensor>> {
        self.tensors.iter().find(|t| t.spec() == spec).cloned()
    }

    /// Number of distinct tensors.
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }
}

/// Decodes, assesses and tensorizes uploads.
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    /// Creates a preprocessor.
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Prepares an upload for every input family among `descriptors`.
    ///
    /// # Errors
    ///
    /// * [`TriageError::OversizeInput`] when the upload exceeds the size limit,
    ///   checked before any decoding.
    /// * [`TriageError::UnsupportedFormat`] when the bytes are not an accepted
    ///   format or fail to decode.
    pub fn prepare<'a>(
        &self,
        bytes: &[u8],
        descriptors: impl IntoIterator<Item = &'a ModelDescriptor>,
    ) -> Result<PreparedImage, TriageError> {
        if bytes.len() > self.config.max_input_bytes {
            return Err(TriageError::oversize_input(
                bytes.len(),
                self.config.max_input_bytes,
            ));
        }

        let (image, source_format) = decode_image(bytes)?;
        let quality = assess_quality(&image);
        debug!(
            %source_format,
            width = quality.width,
            height = quality.height,
            quality = quality.score,
            "decoded upload"
        );

        let mut tensors: Vec<Arc<ImageTensor>> = Vec::new();
        for descriptor in descriptors {
            let spec = &descriptor.input;
            if tensors.iter().any(|t| t.spec() == spec) {
                continue;
            }
            let resized = ResizeCrop::new(spec.height, spec.width, self.config.resize_filter)?
                .apply(&image)?;
            let tensor = NormalizeImage::for_spec(spec)?.to_tensor(&resized, spec)?;
            tensors.push(Arc::new(tensor));
        }

        Ok(PreparedImage {
            tensors,
            quality,
            source_format,
        })
    }
}
