//! Caption layer rasterizer.
//!
//! The typography engine emits the caption as an SVG document the size of
//! the canvas. This module parses it with `usvg` and rasterizes it with
//! `resvg` into a straight-alpha RGBA buffer ready for compositing.
//!
//! Font lookup goes through a shared `fontdb` database: system fonts are
//! loaded once per process, and configured font directories are layered on
//! top per rasterizer.

use super::backend::BackendError;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::{Arc, LazyLock};

static SYSTEM_FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts");
    Arc::new(db)
});

/// Rasterizes SVG caption layers against a fixed font database.
#[derive(Clone)]
pub struct TextRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl TextRasterizer {
    /// System fonts plus every `.ttf`/`.otf`/`.ttc` file directly inside `font_dirs`.
    pub fn new<P: AsRef<Path>>(font_dirs: &[P]) -> Self {
        if font_dirs.is_empty() {
            return Self {
                fontdb: Arc::clone(&SYSTEM_FONTS),
            };
        }
        let mut db = (**SYSTEM_FONTS).clone();
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir.as_ref());
        }
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Use an explicit database, e.g. an empty one in tests.
    pub fn with_database(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Rasterize `svg` at `width`×`height` pixels.
    pub fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<RgbaImage, BackendError> {
        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts)
            .map_err(|e| BackendError::TextLayer(format!("parse caption svg: {e}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            BackendError::TextLayer(format!("cannot allocate {width}x{height} caption pixmap"))
        })?;

        let size = tree.size();
        let xform = resvg::tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, xform, &mut pixmap.as_mut());

        let mut out = RgbaImage::new(width, height);
        for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(out)
    }
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!(font = %path.display(), error = %e, "skipping unreadable font");
        }
    }
}
