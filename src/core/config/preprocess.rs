//! Upload handling configuration.

use crate::core::DEFAULT_MAX_INPUT_BYTES;
use crate::core::validation::clamp_min_size;
use crate::processors::ResizeFilter;
use serde::{Deserialize, Serialize};

/// Limits and resampling choices for the image preprocessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Largest accepted upload in bytes.
    /// Default: 16 MiB
    #[serde(default = "PreprocessConfig::default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Resampling filter for the aspect-preserving resize.
    /// Default: triangle (bilinear)
    #[serde(default)]
    pub resize_filter: ResizeFilter,
}

impl PreprocessConfig {
    /// Set the upload size limit.
    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    /// Set the resize filter.
    pub fn with_resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.resize_filter = filter;
        self
    }

    /// Repairs out-of-range values, logging a warning for each.
    pub fn clamped(mut self) -> Self {
        self.max_input_bytes = clamp_min_size(self.max_input_bytes, "preprocess.max_input_bytes");
        self
    }

    fn default_max_input_bytes() -> usize {
        DEFAULT_MAX_INPUT_BYTES
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: Self::default_max_input_bytes(),
            resize_filter: ResizeFilter::default(),
        }
    }
}
