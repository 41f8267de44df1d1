//! Advisory image quality heuristics.
//!
//! The score combines sharpness (variance of the Laplacian), contrast (standard
//! deviation) and how close mean brightness sits to mid-gray, then discounts
//! images below diagnostic resolution. It never blocks processing.

use crate::core::MIN_DIAGNOSTIC_EDGE;
use image::{DynamicImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;
use serde::{Deserialize, Serialize};

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Quality score of an upload together with the measurements behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Overall score in `[0, 100]`.
    pub score: f64,
    /// Variance of the Laplacian response.
    pub sharpness: f64,
    /// Standard deviation of gray levels.
    pub contrast: f64,
    /// Mean gray level.
    pub brightness: f64,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
}

impl QualityAssessment {
    /// Whether the score falls below `threshold`.
    pub fn is_low(&self, threshold: f64) -> bool {
        self.score < threshold
    }
}

fn mean_and_variance(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, variance)
}

/// Scores the decoded image.
pub fn assess_quality(image: &DynamicImage) -> QualityAssessment {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    let gray: GrayF32 = ImageBuffer::from_fn(width, height, |x, y| {
        Luma([f32::from(luma.get_pixel(x, y)[0])])
    });

    let (brightness, variance) = mean_and_variance(gray.as_raw());
    let contrast = variance.sqrt();

    let laplacian: Vec<f32> = filter3x3(&gray, &LAPLACIAN).into_raw();
    let (_, sharpness) = mean_and_variance(&laplacian);

    let base = ((sharpness / 10.0 + contrast / 2.55 + (100.0 - (brightness - 128.0).abs())) / 3.0)
        .min(100.0);
    let resolution = (f64::from(width.min(height)) / f64::from(MIN_DIAGNOSTIC_EDGE)).min(1.0);
    let score = (base * resolution).clamp(0.0, 100.0);

    QualityAssessment {
        score,
        sharpness,
        contrast,
        brightness,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::format::fixtures::radiograph_like;
    use image::GrayImage;

    #[test]
    fn test_flat_mid_gray_scores_brightness_only() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(256, 256, Luma([128])));
        let q = assess_quality(&image);
        assert_eq!(q.sharpness, 0.0);
        assert_eq!(q.contrast, 0.0);
        assert!((q.score - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_bounded() {
        let noisy = GrayImage::from_fn(256, 256, |x, y| {
            if (x + y) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        });
        let q = assess_quality(&DynamicImage::ImageLuma8(noisy));
        assert!(q.score <= 100.0);
        assert!(q.score > 90.0);

        let black = DynamicImage::ImageLuma8(GrayImage::new(300, 300));
        let q = assess_quality(&black);
        assert!((0.0..=100.0).contains(&q.score));
    }

    #[test]
    fn test_small_images_are_discounted() {
        let large = assess_quality(&radiograph_like(448, 448));
        let small = assess_quality(&radiograph_like(112, 112));
        assert!(small.score < large.score);
        assert_eq!((small.width, small.height), (112, 112));
    }

    #[test]
    fn test_is_low() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([0])));
        assert!(assess_quality(&image).is_low(50.0));
    }
}
