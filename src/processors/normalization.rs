//! Pixel scaling of resized radiographs into model input tensors.
//!
//! Every scaling policy is expressed as a per-channel affine map
//! `value * alpha[c] + beta[c]` over raw 8-bit values, so unit-range and
//! mean/std normalization share one code path.

use crate::core::TriageError;
use crate::domain::{ImageTensor, InputSpec};
use crate::processors::types::{ChannelOrder, ScalingPolicy};
use image::DynamicImage;

/// Normalizes images for one model input family.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: Vec<f32>,
    /// Offset values for each channel (beta = -mean / std)
    pub beta: Vec<f32>,
    /// Channel ordering (CHW or HWC)
    pub order: ChannelOrder,
}

impl NormalizeImage {
    /// Builds the affine coefficients for `scaling` over `channels` channels.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// * `channels` is not 1 or 3
    /// * the mean or std vectors do not have one entry per channel
    /// * any standard deviation is not strictly positive and finite
    pub fn new(
        scaling: &ScalingPolicy,
        channels: u32,
        order: ChannelOrder,
    ) -> Result<Self, TriageError> {
        if channels != 1 && channels != 3 {
            return Err(TriageError::config_error(format!(
                "input channels must be 1 or 3, got {channels}"
            )));
        }
        let scale = 1.0 / 255.0;

        let (alpha, beta) = match scaling {
            ScalingPolicy::UnitRange => (vec![scale; channels as usize], vec![0.0; channels as usize]),
            ScalingPolicy::MeanStd { mean, std } => {
                if mean.len() != channels as usize || std.len() != channels as usize {
                    return Err(TriageError::config_error(format!(
                        "mean/std must have {channels} entries, got {} and {}",
                        mean.len(),
                        std.len()
                    )));
                }
                for (i, &s) in std.iter().enumerate() {
                    if !(s.is_finite() && s > 0.0) {
                        return Err(TriageError::config_error(format!(
                            "Standard deviation at index {i} must be greater than 0, got {s}"
                        )));
                    }
                }
                let alpha = std.iter().map(|s| scale / s).collect();
                let beta = mean.iter().zip(std).map(|(m, s)| -m / s).collect();
                (alpha, beta)
            }
        };

        Ok(Self { alpha, beta, order })
    }

    /// Builds the normalizer matching an input family.
    pub fn for_spec(spec: &InputSpec) -> Result<Self, TriageError> {
        Self::new(&spec.scaling, spec.channels, spec.channel_order)
    }

    fn channels(&self) -> usize {
        self.alpha.len()
    }

    /// Normalizes `img` into a flat vector laid out in `self.order`.
    pub fn normalize(&self, img: &DynamicImage) -> Vec<f32> {
        let channels = self.channels();
        let raw: Vec<u8> = if channels == 1 {
            img.to_luma8().into_raw()
        } else {
            img.to_rgb8().into_raw()
        };
        let pixels = raw.len() / channels;

        match self.order {
            ChannelOrder::HWC => raw
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let c = i % channels;
                    f32::from(v) * self.alpha[c] + self.beta[c]
                })
                .collect(),
            ChannelOrder::CHW => {
                let mut result = vec![0.0f32; raw.len()];
                for (i, &v) in raw.iter().enumerate() {
                    let (p, c) = (i / channels, i % channels);
                    result[c * pixels + p] = f32::from(v) * self.alpha[c] + self.beta[c];
                }
                result
            }
        }
    }

    /// Normalizes an image already resized to `spec` and wraps it as a tensor.
    ///
    /// # Errors
    ///
    /// Returns a normalization `Processing` error when the image size does not
    /// match the family's input size.
    pub fn to_tensor(&self, img: &DynamicImage, spec: &InputSpec) -> Result<ImageTensor, TriageError> {
        if (img.width(), img.height()) != (spec.width, spec.height) {
            return Err(TriageError::normalization(
                "image size does not match the model input",
                crate::core::errors::OpaqueError(format!(
                    "got {}x{}, expected {}x{}",
                    img.width(),
                    img.height(),
                    spec.width,
                    spec.height
                )),
            ));
        }
        let values = self.normalize(img);
        ImageTensor::from_shape_vec(spec.clone(), values).map_err(|e| {
            TriageError::normalization("normalized buffer does not fit the tensor shape", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn two_pixel_image() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 51]));
        img.put_pixel(1, 0, Rgb([0, 255, 102]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_unit_range_hwc() {
        let norm = NormalizeImage::new(&ScalingPolicy::UnitRange, 3, ChannelOrder::HWC).unwrap();
        let values = norm.normalize(&two_pixel_image());
        let expected = [1.0, 0.0, 0.2, 0.0, 1.0, 0.4];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unit_range_chw_groups_channels() {
        let norm = NormalizeImage::new(&ScalingPolicy::UnitRange, 3, ChannelOrder::CHW).unwrap();
        let values = norm.normalize(&two_pixel_image());
        let expected = [1.0, 0.0, 0.0, 1.0, 0.2, 0.4];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mean_std_policy() {
        let scaling = ScalingPolicy::MeanStd {
            mean: vec![0.5],
            std: vec![0.5],
        };
        let norm = NormalizeImage::new(&scaling, 1, ChannelOrder::CHW).unwrap();
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_raw(2, 1, vec![0, 255]).unwrap());
        let values = norm.normalize(&img);
        assert!((values[0] + 1.0).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        assert!(NormalizeImage::new(&ScalingPolicy::UnitRange, 2, ChannelOrder::HWC).is_err());
        assert!(NormalizeImage::new(&ScalingPolicy::imagenet(), 1, ChannelOrder::HWC).is_err());
        let zero_std = ScalingPolicy::MeanStd {
            mean: vec![0.0],
            std: vec![0.0],
        };
        assert!(NormalizeImage::new(&zero_std, 1, ChannelOrder::HWC).is_err());
    }

    #[test]
    fn test_to_tensor_checks_size() {
        let spec = InputSpec::keras_rgb().with_size(1, 2);
        let norm = NormalizeImage::for_spec(&spec).unwrap();
        let tensor = norm.to_tensor(&two_pixel_image(), &spec).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, 2, 3]);

        let wrong = InputSpec::keras_rgb().with_size(4, 4);
        assert!(norm.to_tensor(&two_pixel_image(), &wrong).is_err());
    }
}
