//! Render pipeline and compositor.
//!
//! [`StampEngine::render`] is the one entry point shared by the interactive
//! preview and the batch export. Both go through exactly the same stages, so
//! a preview is a faithful scaled-down copy of the exported file:
//!
//! ```text
//! identify ─▶ canvas/layout ─▶ placement ─▶ decode+resize ─▶ bounds ─▶ caption svg
//!                                                                       │
//!                        encode ◀── flatten ◀── overlay text ◀── overlay photo
//! ```
//!
//! Only decoding and encoding can fail. Bounds detection degrades silently
//! to the placement rect.

use crate::bounds::detect_content_bounds;
use crate::config::StampConfig;
use crate::imaging::calculations::contain_dimensions;
use crate::imaging::{
    BackendError, EncodeParams, Fit, ImageBackend, OutputFormat, Quality, RustBackend,
    SourceInput, TextRasterizer,
};
use crate::layout::{resolve_canvas, resolve_layout};
use crate::placement::{Placement, resolve_placement};
use crate::types::{Canvas, CaptionMetadata, Layout, Rect, SourceInfo, TargetSize};
use crate::typography::{
    Metrics, PlacedFragment, TextLayer, build_text_layer, caption_fragments, place_fragments,
};
use image::{DynamicImage, Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl RenderError {
    /// Errors while reading the source.
    fn decoding(err: BackendError) -> Self {
        Self::Decode(err.to_string())
    }

    /// Errors while producing output, including the caption layer.
    fn encoding(err: BackendError) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Per-call render settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub include_text: bool,
    pub format: OutputFormat,
    pub quality: Quality,
    /// Canvas scale relative to the print size. 1.0 for export.
    pub scale: f64,
}

impl RenderOptions {
    /// Full-resolution captioned render at the configured quality.
    pub fn export(format: OutputFormat, config: &StampConfig) -> Self {
        Self {
            include_text: true,
            format,
            quality: Quality::new(config.output.quality),
            scale: 1.0,
        }
    }

    /// Captioned render at the configured preview scale and quality.
    pub fn preview(format: OutputFormat, config: &StampConfig) -> Self {
        Self {
            include_text: true,
            format,
            quality: Quality::new(config.output.quality),
            scale: config.preview.scale,
        }
    }

    pub fn with_quality(self, quality: Quality) -> Self {
        Self { quality, ..self }
    }

    pub fn without_text(self) -> Self {
        Self {
            include_text: false,
            ..self
        }
    }
}

/// Geometry of one render, before any pixels are touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPlan {
    pub canvas: Canvas,
    pub layout: Layout,
    pub metrics: Metrics,
    pub placement: Placement,
}

/// Caption laid out around one placed photo.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStep {
    /// Canvas rect the caption aligns with: detected content, else the photo rect.
    pub content: Rect,
    pub fragments: Vec<PlacedFragment>,
    pub layer: TextLayer,
}

/// Stateless stamping engine: a codec backend, a caption rasterizer and an
/// immutable configuration.
///
/// `render` takes `&self` and shares nothing mutable, so one engine can be
/// used from many threads at once.
pub struct StampEngine<B: ImageBackend = RustBackend> {
    backend: B,
    rasterizer: TextRasterizer,
    config: StampConfig,
}

impl StampEngine<RustBackend> {
    /// Production engine: `image` codecs and system fonts plus `font_dirs`.
    pub fn new(config: StampConfig) -> Self {
        Self::with_backend(RustBackend::new(), config)
    }
}

impl<B: ImageBackend> StampEngine<B> {
    pub fn with_backend(backend: B, config: StampConfig) -> Self {
        let rasterizer = TextRasterizer::new(&config.typography.font_dirs);
        Self::with_parts(backend, rasterizer, config)
    }

    pub fn with_parts(backend: B, rasterizer: TextRasterizer, config: StampConfig) -> Self {
        Self {
            backend,
            rasterizer,
            config,
        }
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve canvas, layout, metrics and placement for a render.
    pub fn plan(
        &self,
        target: TargetSize,
        source: Option<SourceInfo>,
        include_text: bool,
        scale: f64,
    ) -> RenderPlan {
        let canvas = resolve_canvas(target, source, scale);
        let metrics = Metrics::from_canvas_height(canvas.height, &self.config.typography);
        let layout = resolve_layout(canvas, source, include_text, &metrics, &self.config);
        let placement = resolve_placement(source, &layout, metrics.clearance());
        RenderPlan {
            canvas,
            layout,
            metrics,
            placement,
        }
    }

    /// Render one stamped image and return the encoded bytes.
    ///
    /// `hint` skips the header read when the caller already knows the
    /// source dimensions. A hint that disagrees with the decoded raster is
    /// logged and the decoded size wins.
    #[tracing::instrument(skip_all, fields(source = %source, target = %target))]
    pub fn render(
        &self,
        source: &SourceInput,
        hint: Option<SourceInfo>,
        target: TargetSize,
        caption: &CaptionMetadata,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        let info = match hint {
            Some(info) => info,
            None => self.backend.identify(source).map_err(RenderError::decoding)?,
        };
        let photo = self.backend.decode(source).map_err(RenderError::decoding)?;

        let decoded = SourceInfo::new(photo.width(), photo.height());
        let info = if decoded != info {
            tracing::warn!(
                hint_width = info.width,
                hint_height = info.height,
                width = decoded.width,
                height = decoded.height,
                "source size differs from hint"
            );
            decoded
        } else {
            info
        };

        let plan = self.plan(target, Some(info), options.include_text, options.scale);
        let slot = plan.placement.rect;
        let resized = self.backend.resize(&photo, slot.width, slot.height, plan.placement.fit);
        drop(photo);
        let photo_rect = center_in(slot, resized.width(), resized.height());

        let text = if options.include_text {
            let step = self.caption_step(caption, &plan, &resized, photo_rect);
            let raster = self
                .rasterizer
                .rasterize(&step.layer.svg, step.layer.width, step.layer.height)
                .map_err(RenderError::encoding)?;
            Some(raster)
        } else {
            None
        };

        compose(
            &self.backend,
            plan.canvas,
            self.config.colors.background_rgb(),
            &resized,
            photo_rect,
            text.as_ref(),
            &EncodeParams {
                format: options.format,
                quality: options.quality,
            },
        )
    }

    /// Detect the content of the bitmap drawn at `photo_rect` and lay the
    /// caption out against it in canvas coordinates.
    pub fn caption_step(
        &self,
        caption: &CaptionMetadata,
        plan: &RenderPlan,
        photo: &DynamicImage,
        photo_rect: Rect,
    ) -> CaptionStep {
        let content = detect_bounds(photo, &self.config)
            .map(|r| r.offset(photo_rect.x, photo_rect.y))
            .unwrap_or(photo_rect);
        let fragments = place_fragments(
            &caption_fragments(caption, &self.config.typography.separator),
            &plan.layout,
            content,
            plan.canvas,
            &plan.metrics,
        );
        let layer = build_text_layer(&fragments, plan.canvas, &plan.metrics, &self.config);
        CaptionStep {
            content,
            fragments,
            layer,
        }
    }
}

/// Run the content bounds detector over a placed bitmap.
fn detect_bounds(photo: &DynamicImage, config: &StampConfig) -> Option<Rect> {
    let (w, h) = (photo.width(), photo.height());
    let cfg = &config.detection;
    match photo {
        DynamicImage::ImageRgb8(buf) => detect_content_bounds(buf.as_raw(), w, h, 3, cfg),
        DynamicImage::ImageRgba8(buf) => detect_content_bounds(buf.as_raw(), w, h, 4, cfg),
        other => detect_content_bounds(other.to_rgb8().as_raw(), w, h, 3, cfg),
    }
}

/// Center a `width`×`height` bitmap inside `slot`, shrinking it to fit.
fn center_in(slot: Rect, width: u32, height: u32) -> Rect {
    let (w, h) = if width <= slot.width && height <= slot.height {
        (width, height)
    } else {
        contain_dimensions((width, height), (slot.width, slot.height))
    };
    Rect::new(
        slot.x + (slot.width - w) / 2,
        slot.y + (slot.height - h) / 2,
        w,
        h,
    )
}

/// Paint background, photo and caption onto a fresh canvas and encode it.
///
/// `at` is the canvas rect the photo occupies; a bitmap of a different size
/// is contain-fit into it.
pub fn compose<B: ImageBackend>(
    backend: &B,
    canvas: Canvas,
    background: [u8; 3],
    photo: &DynamicImage,
    at: Rect,
    text: Option<&RgbaImage>,
    params: &EncodeParams,
) -> Result<Vec<u8>, RenderError> {
    let [r, g, b] = background;
    let mut surface = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba([r, g, b, 255]));

    let photo_rect = center_in(at, photo.width(), photo.height());
    let placed = if (photo_rect.width, photo_rect.height) == (photo.width(), photo.height()) {
        photo.to_rgba8()
    } else {
        backend
            .resize(photo, photo_rect.width, photo_rect.height, Fit::Exact)
            .to_rgba8()
    };
    image::imageops::overlay(&mut surface, &placed, photo_rect.x as i64, photo_rect.y as i64);

    if let Some(layer) = text {
        image::imageops::overlay(&mut surface, layer, 0, 0);
    }

    let flat = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(surface).to_rgb8());
    backend.encode(&flat, params).map_err(RenderError::encoding)
}
