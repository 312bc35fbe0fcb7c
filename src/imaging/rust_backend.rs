//! Pure Rust codec backend built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG) | `ImageReader::decode` |
//! | Resize | `resize_exact` / `resize` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless) |
//!
//! Only JPEG and PNG are accepted as input; anything else is a decode error
//! even when the `image` crate could guess the format.

use super::backend::{BackendError, ImageBackend};
use super::params::{EncodeParams, Fit, OutputFormat, SourceInput};
use crate::types::SourceInfo;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufRead, Cursor, Seek};

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject formats outside JPEG/PNG before doing any pixel work.
fn check_format<R: BufRead + Seek>(
    reader: &ImageReader<R>,
    source: &SourceInput,
) -> Result<(), BackendError> {
    match reader.format() {
        Some(ImageFormat::Jpeg | ImageFormat::Png) => Ok(()),
        Some(other) => Err(BackendError::Decode(format!(
            "{source}: unsupported format {other:?}"
        ))),
        None => Err(BackendError::Decode(format!(
            "{source}: unrecognized image data"
        ))),
    }
}

fn read_dimensions<R: BufRead + Seek>(
    reader: ImageReader<R>,
    source: &SourceInput,
) -> Result<SourceInfo, BackendError> {
    check_format(&reader, source)?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| BackendError::Decode(format!("{source}: {e}")))?;
    Ok(SourceInfo::new(width, height))
}

fn read_image<R: BufRead + Seek>(
    reader: ImageReader<R>,
    source: &SourceInput,
) -> Result<DynamicImage, BackendError> {
    check_format(&reader, source)?;
    reader
        .decode()
        .map_err(|e| BackendError::Decode(format!("{source}: {e}")))
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &SourceInput) -> Result<SourceInfo, BackendError> {
        match source {
            SourceInput::Path(path) => {
                read_dimensions(ImageReader::open(path)?.with_guessed_format()?, source)
            }
            SourceInput::Bytes(bytes) => read_dimensions(
                ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?,
                source,
            ),
        }
    }

    fn decode(&self, source: &SourceInput) -> Result<DynamicImage, BackendError> {
        match source {
            SourceInput::Path(path) => {
                read_image(ImageReader::open(path)?.with_guessed_format()?, source)
            }
            SourceInput::Bytes(bytes) => read_image(
                ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?,
                source,
            ),
        }
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32, fit: Fit) -> DynamicImage {
        if image.width() == width && image.height() == height {
            return image.clone();
        }
        match fit {
            Fit::Exact => image.resize_exact(width, height, FilterType::Lanczos3),
            Fit::Contain => image.resize(width, height, FilterType::Lanczos3),
        }
    }

    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        match params.format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel; flatten first.
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buf, params.quality.value() as u8);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
            }
            OutputFormat::Png => {
                let encoder = PngEncoder::new(&mut buf);
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
            }
        }
        Ok(buf)
    }
}
