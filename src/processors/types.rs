//! Types used in image processing operations
//!
//! This module defines the enums that describe how an upload is decoded and how
//! its pixels are laid out and scaled for a model family.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Specifies the order of channels in an image tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Channel, Height, Width order (common in PyTorch)
    CHW,
    /// Height, Width, Channel order (common in TensorFlow/Keras)
    HWC,
}

/// How 8-bit pixel values are mapped into the numeric range a model expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScalingPolicy {
    /// `x / 255`, giving values in `[0, 1]`.
    UnitRange,
    /// `(x / 255 - mean[c]) / std[c]` per channel.
    MeanStd {
        /// Per-channel mean, one entry per input channel.
        mean: Vec<f32>,
        /// Per-channel standard deviation, one entry per input channel.
        std: Vec<f32>,
    },
}

impl ScalingPolicy {
    /// ImageNet mean/std normalization for 3-channel inputs.
    pub fn imagenet() -> Self {
        Self::MeanStd {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }
}

impl Eq for ScalingPolicy {}

impl std::hash::Hash for ScalingPolicy {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let ScalingPolicy::MeanStd { mean, std } = self {
            for v in mean.iter().chain(std.iter()) {
                v.to_bits().hash(state);
            }
        }
    }
}

/// Resampling filter used when resizing, serializable for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    /// Catmull-Rom cubic.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with window 3.
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Upload formats recognized by byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// JPEG / JFIF.
    Jpeg,
    /// PNG.
    Png,
    /// Windows bitmap.
    Bmp,
    /// TIFF, either byte order.
    Tiff,
    /// DICOM Part 10 file (preamble + `DICM`).
    Dicom,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Jpeg => write!(f, "jpeg"),
            SourceFormat::Png => write!(f, "png"),
            SourceFormat::Bmp => write!(f, "bmp"),
            SourceFormat::Tiff => write!(f, "tiff"),
            SourceFormat::Dicom => write!(f, "dicom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_policy_serde_tag() {
        let json = serde_json::to_string(&ScalingPolicy::UnitRange).unwrap();
        assert_eq!(json, r#"{"type":"unit_range"}"#);

        let parsed: ScalingPolicy =
            serde_json::from_str(r#"{"type":"mean_std","mean":[0.5],"std":[0.25]}"#).unwrap();
        assert_eq!(
            parsed,
            ScalingPolicy::MeanStd {
                mean: vec![0.5],
                std: vec![0.25]
            }
        );
    }
}
