//! Aspect-preserving resize followed by a center crop.

use crate::core::TriageError;
use crate::processors::types::ResizeFilter;
use image::DynamicImage;
use image::imageops::FilterType;

/// Crops the center of an image to the target aspect ratio, then scales the
/// crop to the target size.
///
/// No padding is ever introduced and the image is never stretched. Only the
/// crop is resampled, so the working buffer never exceeds the source or the
/// target.
#[derive(Debug, Clone, Copy)]
pub struct ResizeCrop {
    target_width: u32,
    target_height: u32,
    filter: FilterType,
}

impl ResizeCrop {
    /// Creates a resizer for the given target size.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error when either target dimension is zero.
    pub fn new(target_height: u32, target_width: u32, filter: ResizeFilter) -> Result<Self, TriageError> {
        if target_height == 0 || target_width == 0 {
            return Err(TriageError::invalid_input(format!(
                "resize target must be non-zero, got {target_width}x{target_height}"
            )));
        }
        Ok(Self {
            target_width,
            target_height,
            filter: filter.into(),
        })
    }

    /// Centered source region `(x, y, width, height)` with the target aspect
    /// ratio.
    pub fn crop_region(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let (tw, th) = (u64::from(self.target_width), u64::from(self.target_height));
        let (w, h) = (u64::from(width), u64::from(height));
        let (crop_w, crop_h) = if w * th > h * tw {
            let crop_w = ((h * tw + th / 2) / th).clamp(1, w);
            (crop_w, h)
        } else {
            let crop_h = ((w * th + tw / 2) / tw).clamp(1, h);
            (w, crop_h)
        };
        // Both crop sides are bounded by the source sides, which are u32.
        let (crop_w, crop_h) = (crop_w as u32, crop_h as u32);
        ((width - crop_w) / 2, (height - crop_h) / 2, crop_w, crop_h)
    }

    /// Applies the crop and resize.
    ///
    /// # Errors
    ///
    /// Returns a resize `Processing` error for an empty source image.
    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, TriageError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(TriageError::resize_error(
                "source image is empty",
                crate::core::errors::OpaqueError(format!("{width}x{height}")),
            ));
        }

        if (width, height) == (self.target_width, self.target_height) {
            return Ok(image.clone());
        }

        let (x, y, crop_w, crop_h) = self.crop_region(width, height);
        let cropped = image.crop_imm(x, y, crop_w, crop_h);
        Ok(cropped.resize_exact(self.target_width, self.target_height, self.filter))
    }
}
