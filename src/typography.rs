//! Caption typography.
//!
//! Turns [`CaptionMetadata`] into a canvas-sized SVG text layer:
//!
//! 1. **Metrics**: font size from canvas height, every other distance derived
//!    from the font size so previews and exports lay out identically.
//! 2. **Fragments**: location and description joined on the left, the date on
//!    the right. Empty fields render nothing.
//! 3. **Runs**: each fragment is split into CJK and non-CJK runs so each run
//!    gets a font family that actually has its glyphs.
//! 4. **Placement**: one baseline in the bottom band (wrapping the date to a
//!    second line when it would collide), or two rotated fragments along the
//!    right strip.
//!
//! Glyph metrics are estimated from per-character width units rather than
//! measured. The estimate only has to be good enough to keep fragments apart.

use crate::config::{StampConfig, TypographyConfig};
use crate::types::{Canvas, CaptionMetadata, Layout, LayoutMode, Rect, Script, TextRun};
use std::fmt::Write as _;

/// Baseline offset below a line's vertical center, as a fraction of font size.
const BASELINE_SHIFT: f64 = 0.35;
/// Portion of the em box above the baseline.
const ASCENT: f64 = 0.75;
/// Portion of the em box below the baseline.
const DESCENT: f64 = 0.25;

/// Font size and derived spacing for one canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub font_size: f64,
    pub line_height: f64,
    pub line_gap: f64,
    pub edge_margin: f64,
    /// Minimum distance between the left fragment and the date.
    pub min_gap: f64,
}

impl Metrics {
    pub fn from_canvas_height(height: u32, cfg: &TypographyConfig) -> Self {
        let font_size = (height as f64 * cfg.font_ratio).round().max(1.0);
        Self {
            font_size,
            line_height: font_size * cfg.line_height_ratio,
            line_gap: font_size * cfg.line_gap_ratio,
            edge_margin: font_size * cfg.edge_margin_ratio,
            min_gap: font_size * cfg.min_gap_ratio,
        }
    }

    /// Edge margin rounded to whole pixels, used as photo/band clearance.
    pub fn clearance(&self) -> u32 {
        self.edge_margin.round() as u32
    }
}

// =============================================================================
// Script segmentation and width estimation
// =============================================================================

/// True for code points that need a CJK-capable font.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303F     // CJK symbols and punctuation
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0x3400..=0x4DBF   // Extension A
        | 0x4E00..=0x9FFF   // Unified ideographs
        | 0xF900..=0xFAFF   // Compatibility ideographs
        | 0x20000..=0x2A6DF // Extension B
        | 0xAC00..=0xD7AF   // Hangul syllables
        | 0xFF00..=0xFFEF // Halfwidth and fullwidth forms
    )
}

fn script_of(c: char) -> Script {
    if is_cjk(c) { Script::Cjk } else { Script::Latin }
}

/// Split `text` into maximal script-homogeneous runs.
///
/// Concatenating the run texts gives back `text` unchanged.
pub fn segment_runs(text: &str) -> Vec<TextRun> {
    let mut runs: Vec<TextRun> = Vec::new();
    for c in text.chars() {
        let script = script_of(c);
        match runs.last_mut() {
            Some(run) if run.script == script => run.text.push(c),
            _ => runs.push(TextRun {
                text: c.to_string(),
                script,
            }),
        }
    }
    runs
}

/// Advance width of one character in em units.
pub fn char_units(c: char) -> f64 {
    if is_cjk(c) {
        1.0
    } else if c.is_ascii_digit() {
        0.56
    } else if c.is_ascii_uppercase() {
        0.66
    } else if c.is_ascii_lowercase() {
        0.52
    } else if c == ' ' {
        0.28
    } else if c.is_ascii_punctuation() {
        0.34
    } else {
        0.6
    }
}

/// Estimated rendered length of `text` at `font_size`, in pixels.
pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_units).sum::<f64>() * font_size
}

// =============================================================================
// Caption fragments
// =============================================================================

/// The two caption fragments. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionFragments {
    /// Location and description.
    pub left: String,
    /// Date.
    pub right: String,
}

impl CaptionFragments {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Build fragments from resolved caption fields. Blank fields are dropped.
pub fn caption_fragments(caption: &CaptionMetadata, separator: &str) -> CaptionFragments {
    let left = [caption.location.trim(), caption.description.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator);
    let right = caption
        .date
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    CaptionFragments { left, right }
}

// =============================================================================
// Fragment placement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

impl Anchor {
    fn as_svg(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::End => "end",
        }
    }
}

/// A fragment positioned on the canvas.
///
/// `(x, y)` is the anchor point on the baseline. Rotated fragments are
/// turned 90° clockwise around that point and read top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFragment {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub anchor: Anchor,
    pub rotated: bool,
}

fn clamp_to(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Position caption fragments for `layout`.
///
/// `content` is the canvas-space rect the caption should line up with: the
/// detected content bounds when available, otherwise the photo placement.
pub fn place_fragments(
    fragments: &CaptionFragments,
    layout: &Layout,
    content: Rect,
    canvas: Canvas,
    metrics: &Metrics,
) -> Vec<PlacedFragment> {
    if fragments.is_empty() || layout.text_area.is_empty() {
        return Vec::new();
    }
    match layout.mode {
        LayoutMode::Bottom => place_bottom(fragments, layout.text_area, content, canvas, metrics),
        LayoutMode::Right => place_right(fragments, content, canvas, metrics),
    }
}

fn place_bottom(
    fragments: &CaptionFragments,
    band: Rect,
    content: Rect,
    canvas: Canvas,
    m: &Metrics,
) -> Vec<PlacedFragment> {
    let lo = m.edge_margin;
    let hi = canvas.width as f64 - m.edge_margin;
    let start_x = clamp_to(content.x as f64, lo, hi);
    let end_x = clamp_to(content.right() as f64, lo, hi);
    let center = band.y as f64 + band.height as f64 / 2.0;

    let needed = estimate_text_width(&fragments.left, m.font_size)
        + m.min_gap
        + estimate_text_width(&fragments.right, m.font_size);
    let wrap = !fragments.left.is_empty() && !fragments.right.is_empty() && needed > end_x - start_x;

    let (left_y, right_y) = if wrap {
        let block = 2.0 * m.line_height + m.line_gap;
        let top = center - block / 2.0;
        let first = top + m.line_height / 2.0 + BASELINE_SHIFT * m.font_size;
        (first, first + m.line_height + m.line_gap)
    } else {
        let baseline = center + BASELINE_SHIFT * m.font_size;
        (baseline, baseline)
    };

    let mut placed = Vec::with_capacity(2);
    if !fragments.left.is_empty() {
        placed.push(PlacedFragment {
            text: fragments.left.clone(),
            x: start_x,
            y: left_y,
            anchor: Anchor::Start,
            rotated: false,
        });
    }
    if !fragments.right.is_empty() {
        placed.push(PlacedFragment {
            text: fragments.right.clone(),
            x: end_x,
            y: right_y,
            anchor: Anchor::End,
            rotated: false,
        });
    }
    placed
}

fn place_right(
    fragments: &CaptionFragments,
    content: Rect,
    canvas: Canvas,
    m: &Metrics,
) -> Vec<PlacedFragment> {
    // Rotated clockwise, descenders point left toward the photo.
    let column = content.right() as f64 + m.edge_margin + DESCENT * m.font_size;
    let x = column.min(canvas.width as f64 - m.edge_margin - ASCENT * m.font_size);

    let lo = m.edge_margin;
    let hi = canvas.height as f64 - m.edge_margin;
    let mut start_y = clamp_to(content.y as f64, lo, hi);
    let mut end_y = clamp_to(content.bottom() as f64, lo, hi);

    let needed = estimate_text_width(&fragments.left, m.font_size)
        + m.min_gap
        + estimate_text_width(&fragments.right, m.font_size);
    if needed > end_y - start_y {
        start_y = lo;
        end_y = hi;
    }

    let mut placed = Vec::with_capacity(2);
    if !fragments.left.is_empty() {
        placed.push(PlacedFragment {
            text: fragments.left.clone(),
            x,
            y: start_y,
            anchor: Anchor::Start,
            rotated: true,
        });
    }
    if !fragments.right.is_empty() {
        placed.push(PlacedFragment {
            text: fragments.right.clone(),
            x,
            y: end_y,
            anchor: Anchor::End,
            rotated: true,
        });
    }
    placed
}

// =============================================================================
// SVG text layer
// =============================================================================

/// Canvas-sized vector caption layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayer {
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

/// Escape text for use in XML character data and attribute values.
///
/// Characters XML 1.0 cannot carry at all (C0 controls other than tab,
/// newline and carriage return, U+FFFE, U+FFFF) are dropped.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            c if !is_xml_char(c) => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..)
}

fn family_for(script: Script, cfg: &TypographyConfig) -> String {
    let family = match script {
        Script::Cjk => &cfg.cjk_family,
        Script::Latin => &cfg.latin_family,
    };
    xml_escape(&format!("{family}, sans-serif"))
}

/// Render placed fragments as an SVG document the size of `canvas`.
///
/// No fragments (an empty caption) yields a document without a `<text>`
/// element, which rasterizes to a fully transparent layer.
pub fn build_text_layer(
    placed: &[PlacedFragment],
    canvas: Canvas,
    metrics: &Metrics,
    config: &StampConfig,
) -> TextLayer {
    let typo = &config.typography;
    let (w, h) = (canvas.width, canvas.height);
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let fill = xml_escape(&config.colors.text);

    for frag in placed {
        let _ = write!(
            svg,
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{size:.2}" fill="{fill}" text-anchor="{anchor}" xml:space="preserve""#,
            x = frag.x,
            y = frag.y,
            size = metrics.font_size,
            anchor = frag.anchor.as_svg(),
        );
        if frag.rotated {
            let _ = write!(svg, r#" transform="rotate(90 {x:.2} {y:.2})""#, x = frag.x, y = frag.y);
        }
        svg.push('>');
        for run in segment_runs(&frag.text) {
            let _ = write!(
                svg,
                r#"<tspan font-family="{}">{}</tspan>"#,
                family_for(run.script, typo),
                xml_escape(&run.text)
            );
        }
        svg.push_str("</text>");
    }
    svg.push_str("</svg>");

    TextLayer {
        svg,
        width: w,
        height: h,
    }
}
