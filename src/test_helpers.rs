//! Shared test utilities: synthetic photos and encoded fixtures.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let photo = bordered_photo(1000, 800, Rect::new(100, 80, 800, 640), [250; 3], [40, 90, 140]);
//! let tmp = TempDir::new().unwrap();
//! let path = write_jpeg(tmp.path(), "2024/outing.jpg", &photo);
//! ```

use crate::types::Rect;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Synthetic photos
// =========================================================================

/// A single-color photo.
pub fn uniform_photo(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// A photo with a solid `border` margin around a solid `content` rect.
pub fn bordered_photo(
    width: u32,
    height: u32,
    content: Rect,
    border: [u8; 3],
    fill: [u8; 3],
) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = x >= content.x && x < content.right() && y >= content.y && y < content.bottom();
        Rgb(if inside { fill } else { border })
    })
}

// =========================================================================
// Encoded fixtures
// =========================================================================

pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

pub fn encode_jpeg(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 90))
        .unwrap();
    buf
}

/// Write `bytes` to `root/rel`, creating parent directories.
pub fn write_fixture(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn write_jpeg(root: &Path, rel: &str, img: &RgbImage) -> PathBuf {
    write_fixture(root, rel, &encode_jpeg(img))
}

pub fn write_png(root: &Path, rel: &str, img: &RgbImage) -> PathBuf {
    write_fixture(root, rel, &encode_png(img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bordered_photo_paints_content_rect() {
        let img = bordered_photo(10, 8, Rect::new(2, 1, 5, 4), [255; 3], [0; 3]);
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(2, 1), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(6, 4), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(7, 4), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(6, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn fixtures_land_in_nested_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = write_png(tmp.path(), "a/b/c.png", &uniform_photo(4, 4, [1, 2, 3]));
        assert!(path.exists());
        assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
    }
}
