//! Minimal reader for DICOM-like radiograph containers.
//!
//! Only what is needed to get pixels out of an uncompressed little-endian
//! Part 10 file is supported: the file meta group, explicit or implicit VR
//! datasets, undefined-length sequences (skipped), and native pixel data with 8
//! or 16 bits per sample. Encapsulated (compressed) pixel data and big-endian
//! transfer syntaxes are rejected as unsupported.

use crate::core::TriageError;
use image::{DynamicImage, GrayImage, RgbImage};

const PREAMBLE_LEN: usize = 128;
const MAGIC_LEN: usize = 4;
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

const IMPLICIT_VR_LE: &str = "1.2.840.10008.1.2";
const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

const TAG_TRANSFER_SYNTAX: Tag = Tag(0x0002, 0x0010);
const TAG_SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
const TAG_PHOTOMETRIC: Tag = Tag(0x0028, 0x0004);
const TAG_PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
const TAG_ROWS: Tag = Tag(0x0028, 0x0010);
const TAG_COLUMNS: Tag = Tag(0x0028, 0x0011);
const TAG_BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
const TAG_PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
const TAG_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
const TAG_ITEM: Tag = Tag(0xFFFE, 0xE000);
const TAG_ITEM_DELIMITATION: Tag = Tag(0xFFFE, 0xE00D);
const TAG_SEQUENCE_DELIMITATION: Tag = Tag(0xFFFE, 0xE0DD);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tag(u16, u16);

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// A data element header; the reader sits at the start of its value.
#[derive(Debug)]
struct Element {
    tag: Tag,
    vr: Option<[u8; 2]>,
    length: u32,
}

/// Pixel module attributes collected while walking the dataset.
#[derive(Debug, Default)]
struct PixelModule {
    rows: Option<u16>,
    columns: Option<u16>,
    samples_per_pixel: Option<u16>,
    bits_allocated: Option<u16>,
    pixel_representation: Option<u16>,
    planar_configuration: Option<u16>,
    photometric: Option<String>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    explicit_vr: bool,
}

impl<'a> Reader<'a> {
    fn unsupported(detail: impl std::fmt::Display) -> TriageError {
        TriageError::unsupported_format(format!("DICOM: {detail}"))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], TriageError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| Self::unsupported(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, TriageError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, TriageError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn peek_tag(&self) -> Option<Tag> {
        let b = self.bytes.get(self.pos..self.pos + 4)?;
        Some(Tag(
            u16::from_le_bytes([b[0], b[1]]),
            u16::from_le_bytes([b[2], b[3]]),
        ))
    }

    fn element(&mut self) -> Result<Element, TriageError> {
        let tag = Tag(self.u16()?, self.u16()?);

        // Item and delimiter tags never carry a VR.
        if tag.0 == 0xFFFE {
            let length = self.u32()?;
            return Ok(Element {
                tag,
                vr: None,
                length,
            });
        }

        if self.explicit_vr {
            let vr_bytes = self.take(2)?;
            let vr = [vr_bytes[0], vr_bytes[1]];
            let length = if has_long_length(&vr) {
                self.take(2)?;
                self.u32()?
            } else {
                u32::from(self.u16()?)
            };
            Ok(Element {
                tag,
                vr: Some(vr),
                length,
            })
        } else {
            let length = self.u32()?;
            Ok(Element {
                tag,
                vr: None,
                length,
            })
        }
    }

    fn value(&mut self, element: &Element) -> Result<&'a [u8], TriageError> {
        self.take(element.length as usize)
    }

    /// Skips the items of an undefined-length sequence up to its delimiter.
    fn skip_undefined_sequence(&mut self, depth: usize) -> Result<(), TriageError> {
        if depth > 16 {
            return Err(Self::unsupported("sequences nested too deeply"));
        }
        loop {
            let item = self.element()?;
            match item.tag {
                TAG_SEQUENCE_DELIMITATION => return Ok(()),
                TAG_ITEM if item.length == UNDEFINED_LENGTH => self.skip_undefined_item(depth)?,
                TAG_ITEM => {
                    self.value(&item)?;
                }
                other => {
                    return Err(Self::unsupported(format!(
                        "unexpected tag {other} inside sequence"
                    )));
                }
            }
        }
    }

    fn skip_undefined_item(&mut self, depth: usize) -> Result<(), TriageError> {
        loop {
            let element = self.element()?;
            if element.tag == TAG_ITEM_DELIMITATION {
                return Ok(());
            }
            if element.length == UNDEFINED_LENGTH {
                self.skip_undefined_sequence(depth + 1)?;
            } else {
                self.value(&element)?;
            }
        }
    }
}

fn has_long_length(vr: &[u8; 2]) -> bool {
    matches!(
        vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"SV" | b"UC" | b"UN" | b"UR"
            | b"UT" | b"UV"
    )
}

fn read_us(value: &[u8]) -> Option<u16> {
    (value.len() >= 2).then(|| u16::from_le_bytes([value[0], value[1]]))
}

fn read_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Decodes the pixel data of a DICOM-like container into an image.
///
/// # Errors
///
/// Returns [`TriageError::UnsupportedFormat`] for anything outside the supported
/// subset, or for truncated / inconsistent files.
pub fn decode_dicom(bytes: &[u8]) -> Result<DynamicImage, TriageError> {
    if bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + MAGIC_LEN) != Some(b"DICM".as_slice()) {
        return Err(Reader::unsupported("missing DICM magic after preamble"));
    }

    // The file meta group is always explicit VR little endian.
    let mut reader = Reader {
        bytes,
        pos: PREAMBLE_LEN + MAGIC_LEN,
        explicit_vr: true,
    };

    let mut transfer_syntax = None;
    while reader.peek_tag().is_some_and(|tag| tag.0 == 0x0002) {
        let element = reader.element()?;
        let value = reader.value(&element)?;
        if element.tag == TAG_TRANSFER_SYNTAX {
            transfer_syntax = Some(read_text(value));
        }
    }

    reader.explicit_vr = match transfer_syntax.as_deref() {
        Some(EXPLICIT_VR_LE) => true,
        Some(IMPLICIT_VR_LE) | None => false,
        Some(other) => {
            return Err(Reader::unsupported(format!(
                "transfer syntax {other} is not an uncompressed little-endian syntax"
            )));
        }
    };

    let mut module = PixelModule::default();
    while !reader.at_end() {
        let element = reader.element()?;

        if element.tag == TAG_PIXEL_DATA {
            if element.length == UNDEFINED_LENGTH {
                return Err(Reader::unsupported("encapsulated pixel data is not supported"));
            }
            let pixels = reader.value(&element)?;
            return build_image(&module, pixels);
        }

        let is_sequence = element.vr.as_ref() == Some(b"SQ");
        if element.length == UNDEFINED_LENGTH {
            if is_sequence || element.vr.is_none() {
                reader.skip_undefined_sequence(0)?;
                continue;
            }
            return Err(Reader::unsupported(format!(
                "undefined length on non-sequence element {}",
                element.tag
            )));
        }

        let value = reader.value(&element)?;
        match element.tag {
            TAG_ROWS => module.rows = read_us(value),
            TAG_COLUMNS => module.columns = read_us(value),
            TAG_SAMPLES_PER_PIXEL => module.samples_per_pixel = read_us(value),
            TAG_BITS_ALLOCATED => module.bits_allocated = read_us(value),
            TAG_PIXEL_REPRESENTATION => module.pixel_representation = read_us(value),
            TAG_PLANAR_CONFIGURATION => module.planar_configuration = read_us(value),
            TAG_PHOTOMETRIC => module.photometric = Some(read_text(value)),
            _ => {}
        }
    }

    Err(Reader::unsupported("no pixel data element"))
}

fn build_image(module: &PixelModule, pixels: &[u8]) -> Result<DynamicImage, TriageError> {
    let rows = module
        .rows
        .ok_or_else(|| Reader::unsupported("missing Rows (0028,0010)"))?;
    let columns = module
        .columns
        .ok_or_else(|| Reader::unsupported("missing Columns (0028,0011)"))?;
    if rows == 0 || columns == 0 {
        return Err(Reader::unsupported("zero image dimension"));
    }
    let samples = module.samples_per_pixel.unwrap_or(1);
    let bits = module.bits_allocated.unwrap_or(8);
    let photometric = module.photometric.as_deref().unwrap_or("MONOCHROME2");
    let (width, height) = (u32::from(columns), u32::from(rows));
    let pixel_count = usize::from(rows) * usize::from(columns);

    let expected = pixel_count * usize::from(samples) * usize::from(bits / 8);
    if pixels.len() < expected {
        return Err(Reader::unsupported(format!(
            "pixel data holds {} bytes, {expected} expected",
            pixels.len()
        )));
    }

    match (samples, bits) {
        (1, 8) => {
            let mut gray = pixels[..pixel_count].to_vec();
            if photometric == "MONOCHROME1" {
                gray.iter_mut().for_each(|v| *v = 255 - *v);
            }
            GrayImage::from_raw(width, height, gray)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| Reader::unsupported("pixel buffer size mismatch"))
        }
        (1, 16) => {
            let signed = module.pixel_representation == Some(1);
            let values: Vec<f32> = pixels[..pixel_count * 2]
                .chunks_exact(2)
                .map(|b| {
                    if signed {
                        f32::from(i16::from_le_bytes([b[0], b[1]]))
                    } else {
                        f32::from(u16::from_le_bytes([b[0], b[1]]))
                    }
                })
                .collect();
            let mut gray = window_to_u8(&values);
            if photometric == "MONOCHROME1" {
                gray.iter_mut().for_each(|v| *v = 255 - *v);
            }
            GrayImage::from_raw(width, height, gray)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| Reader::unsupported("pixel buffer size mismatch"))
        }
        (3, 8) => {
            let raw = &pixels[..pixel_count * 3];
            let rgb = if module.planar_configuration == Some(1) {
                let (r, rest) = raw.split_at(pixel_count);
                let (g, b) = rest.split_at(pixel_count);
                (0..pixel_count).flat_map(|i| [r[i], g[i], b[i]]).collect()
            } else {
                raw.to_vec()
            };
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| Reader::unsupported("pixel buffer size mismatch"))
        }
        (samples, bits) => Err(Reader::unsupported(format!(
            "{samples} samples per pixel at {bits} bits allocated is not supported"
        ))),
    }
}

/// Linearly maps the full value range onto `0..=255`.
fn window_to_u8(values: &[f32]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|&v| (((v - min) / span) * 255.0).round() as u8)
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Writes DICOM-like files for tests.
    pub(crate) struct DicomWriter {
        bytes: Vec<u8>,
        explicit: bool,
    }

    impl DicomWriter {
        pub(crate) fn new(transfer_syntax: &str) -> Self {
            let mut writer = Self {
                bytes: vec![0u8; 128],
                explicit: true,
            };
            writer.bytes.extend_from_slice(b"DICM");
            writer.text(0x0002, 0x0010, b"UI", transfer_syntax);
            writer.explicit = transfer_syntax == super::EXPLICIT_VR_LE;
            writer
        }

        fn header(&mut self, group: u16, element: u16, vr: &[u8; 2], len: u32) {
            self.bytes.extend_from_slice(&group.to_le_bytes());
            self.bytes.extend_from_slice(&element.to_le_bytes());
            if self.explicit {
                self.bytes.extend_from_slice(vr);
                if super::has_long_length(vr) {
                    self.bytes.extend_from_slice(&[0, 0]);
                    self.bytes.extend_from_slice(&len.to_le_bytes());
                } else {
                    self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
                }
            } else {
                self.bytes.extend_from_slice(&len.to_le_bytes());
            }
        }

        pub(crate) fn text(&mut self, group: u16, element: u16, vr: &[u8; 2], value: &str) {
            let mut value = value.as_bytes().to_vec();
            if value.len() % 2 == 1 {
                value.push(if vr == b"UI" { 0 } else { b' ' });
            }
            self.header(group, element, vr, value.len() as u32);
            self.bytes.extend_from_slice(&value);
        }

        pub(crate) fn us(&mut self, group: u16, element: u16, value: u16) {
            self.header(group, element, b"US", 2);
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }

        /// Writes an undefined-length sequence holding one undefined-length item.
        pub(crate) fn undefined_sequence(&mut self, group: u16, element: u16) {
            self.header(group, element, b"SQ", super::UNDEFINED_LENGTH);
            self.bytes.extend_from_slice(&0xFFFEu16.to_le_bytes());
            self.bytes.extend_from_slice(&0xE000u16.to_le_bytes());
            self.bytes.extend_from_slice(&super::UNDEFINED_LENGTH.to_le_bytes());
            // One short text element inside the item.
            self.text(0x0008, 0x0100, b"SH", "T-D3000");
            self.bytes.extend_from_slice(&0xFFFEu16.to_le_bytes());
            self.bytes.extend_from_slice(&0xE00Du16.to_le_bytes());
            self.bytes.extend_from_slice(&0u32.to_le_bytes());
            self.bytes.extend_from_slice(&0xFFFEu16.to_le_bytes());
            self.bytes.extend_from_slice(&0xE0DDu16.to_le_bytes());
            self.bytes.extend_from_slice(&0u32.to_le_bytes());
        }

        pub(crate) fn pixel_data(&mut self, vr: &[u8; 2], data: &[u8]) {
            self.header(0x7FE0, 0x0010, vr, data.len() as u32);
            self.bytes.extend_from_slice(data);
        }

        pub(crate) fn finish(self) -> Vec<u8> {
            self.bytes
        }
    }

    /// An 8-bit MONOCHROME2 explicit-VR file with a horizontal gradient.
    pub(crate) fn gradient_dicom(width: u16, height: u16) -> Vec<u8> {
        let mut w = DicomWriter::new(super::EXPLICIT_VR_LE);
        w.us(0x0028, 0x0002, 1);
        w.text(0x0028, 0x0004, b"CS", "MONOCHROME2");
        w.us(0x0028, 0x0010, height);
        w.us(0x0028, 0x0011, width);
        w.us(0x0028, 0x0100, 8);
        let pixels: Vec<u8> = (0..height)
            .flat_map(|_| (0..width).map(move |x| (u32::from(x) * 255 / u32::from(width.max(2) - 1)) as u8))
            .collect();
        w.pixel_data(b"OB", &pixels);
        w.finish()
    }
}
