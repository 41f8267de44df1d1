//! Byte-signature detection and decoding of uploaded images.

use crate::core::TriageError;
use crate::processors::dicom::decode_dicom;
use crate::processors::types::SourceFormat;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const BMP_MAGIC: &[u8] = b"BM";
const TIFF_LE_MAGIC: &[u8] = &[b'I', b'I', 0x2A, 0x00];
const TIFF_BE_MAGIC: &[u8] = &[b'M', b'M', 0x00, 0x2A];
const DICOM_PREAMBLE_LEN: usize = 128;
const DICOM_MAGIC: &[u8] = b"DICM";

/// Identifies the upload format from its leading bytes.
///
/// Returns `None` when the bytes carry none of the accepted signatures.
pub fn sniff_format(bytes: &[u8]) -> Option<SourceFormat> {
    if bytes.starts_with(PNG_MAGIC) {
        Some(SourceFormat::Png)
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some(SourceFormat::Jpeg)
    } else if bytes.starts_with(TIFF_LE_MAGIC) || bytes.starts_with(TIFF_BE_MAGIC) {
        Some(SourceFormat::Tiff)
    } else if is_dicom(bytes) {
        Some(SourceFormat::Dicom)
    } else if bytes.starts_with(BMP_MAGIC) {
        Some(SourceFormat::Bmp)
    } else {
        None
    }
}

fn is_dicom(bytes: &[u8]) -> bool {
    bytes
        .get(DICOM_PREAMBLE_LEN..DICOM_PREAMBLE_LEN + DICOM_MAGIC.len())
        .is_some_and(|magic| magic == DICOM_MAGIC)
}

/// Maps a sniffed format to the `image` crate decoder; `None` for DICOM.
fn raster_format(format: SourceFormat) -> Option<ImageFormat> {
    match format {
        SourceFormat::Jpeg => Some(ImageFormat::Jpeg),
        SourceFormat::Png => Some(ImageFormat::Png),
        SourceFormat::Bmp => Some(ImageFormat::Bmp),
        SourceFormat::Tiff => Some(ImageFormat::Tiff),
        SourceFormat::Dicom => None,
    }
}

/// Decodes an upload into an image, reporting which format it was.
///
/// # Errors
///
/// Returns [`TriageError::UnsupportedFormat`] when the signature is unknown or
/// the stream does not decode as the format its signature claims.
pub fn decode_image(bytes: &[u8]) -> Result<(DynamicImage, SourceFormat), TriageError> {
    let format = sniff_format(bytes).ok_or_else(|| {
        TriageError::unsupported_format(
            "byte stream does not match JPEG, PNG, BMP, TIFF or DICOM signatures",
        )
    })?;
    debug!(%format, bytes = bytes.len(), "decoding upload");

    let image = match raster_format(format) {
        None => decode_dicom(bytes)?,
        Some(image_format) => image::load_from_memory_with_format(bytes, image_format)
            .map_err(|e| {
                TriageError::unsupported_format(format!("{format} stream could not be decoded: {e}"))
            })?,
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(TriageError::unsupported_format(format!(
            "{format} image has zero width or height"
        )));
    }

    Ok((image, format))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// A grayscale gradient with a bright disc, so it has both contrast and edges.
    pub(crate) fn radiograph_like(width: u32, height: u32) -> DynamicImage {
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let radius = width.min(height) as f32 / 4.0;
        let img = GrayImage::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let base = (x * 200 / width.max(1)) as u8;
            if (dx * dx + dy * dy).sqrt() < radius {
                Luma([base.saturating_add(55)])
            } else {
                Luma([base])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, format)
            .expect("in-memory encoding should succeed");
        buffer.into_inner()
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(&radiograph_like(width, height), ImageFormat::Png)
    }
}
