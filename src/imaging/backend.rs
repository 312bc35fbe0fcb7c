//! Image codec backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the four operations the engine needs
//! from a codec: identify, decode, resize, and encode. The production
//! implementation is [`RustBackend`](super::rust_backend::RustBackend); tests
//! use the recording `MockBackend` below.

use super::params::{EncodeParams, Fit, SourceInput};
use crate::types::SourceInfo;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Caption layer failed: {0}")]
    TextLayer(String),
}

/// Trait for image codec backends.
///
/// `Sync` so one backend can serve an export worker pool.
pub trait ImageBackend: Sync {
    /// Read pixel dimensions without a full decode where the format allows it.
    fn identify(&self, source: &SourceInput) -> Result<SourceInfo, BackendError>;

    /// Decode the full raster.
    fn decode(&self, source: &SourceInput) -> Result<DynamicImage, BackendError>;

    /// Scale a decoded raster to `width`×`height` according to `fit`.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32, fit: Fit) -> DynamicImage;

    /// Encode a finished canvas.
    fn encode(&self, image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::{OutputFormat, Quality};
    use image::{Rgb, RgbImage};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock backend that records operations and serves synthetic rasters.
    ///
    /// Sources are keyed by their `Display` form (the path for
    /// [`SourceInput::Path`]). Unknown sources fail to identify and decode.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub sources: Mutex<HashMap<String, SourceInfo>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Decode(String),
        Resize {
            width: u32,
            height: u32,
            fit: Fit,
        },
        Encode {
            format: OutputFormat,
            quality: u32,
            width: u32,
            height: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a source key with the dimensions it decodes to.
        pub fn with_source(self, key: &str, width: u32, height: u32) -> Self {
            self.sources
                .lock()
                .unwrap()
                .insert(key.to_string(), SourceInfo::new(width, height));
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn lookup(&self, source: &SourceInput) -> Result<SourceInfo, BackendError> {
            self.sources
                .lock()
                .unwrap()
                .get(&source.to_string())
                .copied()
                .ok_or_else(|| BackendError::Decode(format!("no mock source {source}")))
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &SourceInput) -> Result<SourceInfo, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(source.to_string()));
            self.lookup(source)
        }

        fn decode(&self, source: &SourceInput) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(source.to_string()));
            let info = self.lookup(source)?;
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                info.width,
                info.height,
                Rgb([96, 120, 150]),
            )))
        }

        fn resize(&self, image: &DynamicImage, width: u32, height: u32, fit: Fit) -> DynamicImage {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                width,
                height,
                fit,
            });
            image.resize_exact(width, height, image::imageops::FilterType::Nearest)
        }

        fn encode(
            &self,
            image: &DynamicImage,
            params: &EncodeParams,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format: params.format,
                quality: params.quality.value(),
                width: image.width(),
                height: image.height(),
            });
            Ok(format!("{}:{}x{}", params.format, image.width(), image.height()).into_bytes())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::new().with_source("/test/image.jpg", 800, 600);

        let info = backend
            .identify(&SourceInput::Path("/test/image.jpg".into()))
            .unwrap();
        assert_eq!(info, SourceInfo::new(800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_unknown_source_fails_to_decode() {
        let backend = MockBackend::new();
        let result = backend.decode(&SourceInput::Path("/missing.jpg".into()));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 3));
        let bytes = backend
            .encode(
                &img,
                &EncodeParams {
                    format: OutputFormat::Png,
                    quality: Quality::new(80),
                },
            )
            .unwrap();

        assert_eq!(bytes, b"png:4x3");
        assert!(matches!(
            backend.get_operations()[0],
            RecordedOp::Encode {
                quality: 80,
                width: 4,
                height: 3,
                ..
            }
        ));
    }
}
