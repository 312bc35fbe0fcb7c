//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Uniform scale that fits `source` inside `area` (contain-fit).
///
/// Zero-sized inputs give a scale of 0.
pub fn fit_scale(source: (u32, u32), area: (u32, u32)) -> f64 {
    let (src_w, src_h) = source;
    let (area_w, area_h) = area;
    if src_w == 0 || src_h == 0 {
        return 0.0;
    }
    (area_w as f64 / src_w as f64).min(area_h as f64 / src_h as f64)
}

/// Contain-fit dimensions of `source` inside `area`.
///
/// Each side is `round(src × scale)`, at least 1 px and never larger than
/// the area, so rounding can never push the photo outside its slot.
///
/// # Examples
/// ```
/// # use photo_stamp::imaging::calculations::contain_dimensions;
/// // 4:3 photo into a 1800×1171 slot is height-bound
/// assert_eq!(contain_dimensions((4000, 3000), (1800, 1171)), (1561, 1171));
/// ```
pub fn contain_dimensions(source: (u32, u32), area: (u32, u32)) -> (u32, u32) {
    let scale = fit_scale(source, area);
    let w = (source.0 as f64 * scale).round() as u32;
    let h = (source.1 as f64 * scale).round() as u32;
    (w.clamp(1, area.0.max(1)), h.clamp(1, area.1.max(1)))
}

/// Offset that centers `slack` pixels of free space, but keeps at least
/// `clearance` pixels on the far side when the slack allows it.
///
/// The far side is the one facing the caption band. When centering would
/// leave less than `clearance` there, the content is pulled toward the near
/// side, never past it.
pub fn offset_with_clearance(slack: u32, clearance: u32) -> u32 {
    (slack / 2).min(slack.saturating_sub(clearance))
}

/// Dimensions of a buffer downsampled so the longer side is at most `max_edge`.
///
/// Buffers already within the bound are returned unchanged.
pub fn downsampled_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_edge || longer == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / longer as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Scale `(width, height)` by `scale`, rounding and keeping each side at least 1 px.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
