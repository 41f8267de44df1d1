//! Image processing for radiograph uploads.
//!
//! # Modules
//!
//! * `format` - Byte-signature sniffing and raster decoding
//! * `dicom` - Minimal reader for uncompressed DICOM-like containers
//! * `resize` - Aspect-preserving resize and center crop
//! * `normalization` - Pixel scaling into model input tensors
//! * `quality` - Advisory image quality heuristics
//! * `types` - Type definitions used across the processors module

pub mod dicom;
pub mod format;
mod normalization;
pub mod quality;
mod resize;
pub mod types;

pub use dicom::decode_dicom;
pub use format::{decode_image, sniff_format};
pub use normalization::*;
pub use quality::{QualityAssessment, assess_quality};
pub use resize::*;
pub use types::*;
