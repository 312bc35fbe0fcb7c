//! Image placement inside the image area.
//!
//! The photo is contain-fit into the image area and centered. Along the axis
//! that faces the caption band it is then pulled away from the band whenever
//! centering would leave less than one edge margin of clearance, so the
//! caption can never touch the photo.

use crate::imaging::Fit;
use crate::imaging::calculations::{contain_dimensions, offset_with_clearance};
use crate::types::{Layout, LayoutMode, Rect, SourceInfo};

/// Where and how the photo lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Canvas-space rect reserved for the photo.
    pub rect: Rect,
    /// `Exact` when `rect` already has the photo's aspect; `Contain` when the
    /// compositor still has to fit and center the bitmap inside `rect`.
    pub fit: Fit,
}

/// Place a source of known size, or fall back to a contain-fit slot when the
/// size is unknown.
///
/// `clearance` is the minimum gap, in pixels, kept between the photo and the
/// caption band when there is slack to do so.
pub fn resolve_placement(source: Option<SourceInfo>, layout: &Layout, clearance: u32) -> Placement {
    let area = layout.image_area;
    let Some(info) = source else {
        return Placement {
            rect: area,
            fit: Fit::Contain,
        };
    };

    let (width, height) = contain_dimensions((info.width, info.height), (area.width, area.height));
    let slack_x = area.width.saturating_sub(width);
    let slack_y = area.height.saturating_sub(height);

    // Only a non-empty band needs clearance.
    let clearance = if layout.text_area.is_empty() { 0 } else { clearance };
    let (dx, dy) = match layout.mode {
        LayoutMode::Bottom => (slack_x / 2, offset_with_clearance(slack_y, clearance)),
        LayoutMode::Right => (offset_with_clearance(slack_x, clearance), slack_y / 2),
    };

    Placement {
        rect: Rect::new(area.x + dx, area.y + dy, width, height),
        fit: Fit::Exact,
    }
}
