//! Canvas & layout resolution.
//!
//! Decides how big the output is, whether the caption runs along the bottom
//! or up the right edge, and how the canvas splits into a photo area and a
//! caption band.
//!
//! ```text
//!  Bottom mode                      Right mode (height/width ≥ 1.8)
//! ┌──────────────────────┐         ┌──────────┬──┐
//! │                      │         │          │ c│
//! │      image area      │         │  image   │ a│
//! │                      │         │  area    │ p│
//! ├──────────────────────┤         │          │ t│
//! │ caption band         │         │          │  │
//! └──────────────────────┘         └──────────┴──┘
//! ```
//!
//! Band thickness is measured in font sizes, and font size is proportional
//! to canvas height, so the split is identical (up to rounding) between a
//! quarter-scale preview and the full-resolution export.

use crate::config::StampConfig;
use crate::imaging::calculations::scaled_dimensions;
use crate::typography::Metrics;
use crate::types::{Canvas, Layout, LayoutMode, Rect, SourceInfo, TargetSize};

/// Canvas for `target`, swapped for portrait sources and scaled by `scale`.
///
/// Export renders pass `scale = 1.0`; previews pass the configured preview scale.
pub fn resolve_canvas(target: TargetSize, source: Option<SourceInfo>, scale: f64) -> Canvas {
    let (w, h) = target.pixels();
    let (w, h) = match source {
        Some(info) if info.is_portrait() => (h, w),
        _ => (w, h),
    };
    let (width, height) = if scale == 1.0 {
        (w, h)
    } else {
        scaled_dimensions(w, h, scale)
    };
    Canvas { width, height }
}

/// `Right` only for captioned extreme portraits; everything else is `Bottom`.
pub fn resolve_mode(source: Option<SourceInfo>, include_text: bool, config: &StampConfig) -> LayoutMode {
    match source {
        Some(info) if include_text && info.aspect() >= config.layout.right_mode_aspect => {
            LayoutMode::Right
        }
        _ => LayoutMode::Bottom,
    }
}

/// Caption band thickness in pixels.
///
/// At least `band_multiple` font sizes, and always enough for two lines,
/// the gap between them, and an edge margin on both sides.
pub fn band_thickness(metrics: &Metrics, config: &StampConfig) -> u32 {
    let two_lines = 2.0 * metrics.line_height + metrics.line_gap + 2.0 * metrics.edge_margin;
    let minimum = metrics.font_size * config.layout.band_multiple;
    two_lines.max(minimum).ceil() as u32
}

/// Split the canvas into image area and text area.
///
/// Invariants: the two areas never overlap, both lie inside the canvas, and
/// the text area is empty when `include_text` is false.
pub fn resolve_layout(
    canvas: Canvas,
    source: Option<SourceInfo>,
    include_text: bool,
    metrics: &Metrics,
    config: &StampConfig,
) -> Layout {
    let mode = resolve_mode(source, include_text, config);

    if !include_text {
        return Layout {
            mode,
            image_area: canvas.rect(),
            text_area: Rect::new(0, canvas.height, canvas.width, 0),
        };
    }

    let band = band_thickness(metrics, config);
    match mode {
        LayoutMode::Bottom => {
            let band = band.min(canvas.height.saturating_sub(1));
            let image_h = canvas.height - band;
            Layout {
                mode,
                image_area: Rect::new(0, 0, canvas.width, image_h),
                text_area: Rect::new(0, image_h, canvas.width, band),
            }
        }
        LayoutMode::Right => {
            let band = band.min(canvas.width.saturating_sub(1));
            let image_w = canvas.width - band;
            Layout {
                mode,
                image_area: Rect::new(0, 0, image_w, canvas.height),
                text_area: Rect::new(image_w, 0, band, canvas.height),
            }
        }
    }
}
