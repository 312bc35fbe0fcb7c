//! Shared types used across every stage of a render.
//!
//! Everything here is ephemeral: a render computes a [`Canvas`], a [`Layout`],
//! a placement rect and optional content bounds from scratch, uses them once,
//! and drops them. Nothing outlives a single call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned pixel rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when `other` lies entirely inside `self`. Empty rects on the
    /// boundary count as contained.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True when the two rects share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Shift by an origin, e.g. to move a buffer-relative rect into canvas space.
    pub const fn offset(&self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Pixel dimensions of the original raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
}

impl SourceInfo {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Height over width. Zero-width sources report 0 so they never trip
    /// the extreme-portrait heuristic.
    pub fn aspect(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f64 / self.width as f64
    }
}

/// Resolved output dimensions for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

/// Named print-size preset.
///
/// All presets are specified at 300 DPI in landscape orientation; the
/// canvas is swapped for portrait sources.
///
/// | Id | Print | Pixels |
/// |----|-------|--------|
/// | `5` | 5×3.5 in | 1500×1050 |
/// | `6` | 6×4 in | 1800×1200 |
/// | `6L` | 6×4.5 in | 1800×1350 |
/// | `7` | 7×5 in | 2100×1500 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSize {
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "6L")]
    SixL,
    #[serde(rename = "7")]
    Seven,
}

impl TargetSize {
    pub const ALL: [TargetSize; 4] = [Self::Five, Self::Six, Self::SixL, Self::Seven];
    pub const DPI: u32 = 300;

    pub const fn id(self) -> &'static str {
        match self {
            Self::Five => "5",
            Self::Six => "6",
            Self::SixL => "6L",
            Self::Seven => "7",
        }
    }

    /// Landscape pixel dimensions `(width, height)`.
    pub const fn pixels(self) -> (u32, u32) {
        match self {
            Self::Five => (1500, 1050),
            Self::Six => (1800, 1200),
            Self::SixL => (1800, 1350),
            Self::Seven => (2100, 1500),
        }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target size '{0}' (expected one of 5, 6, 6L, 7)")]
pub struct UnknownTargetSize(pub String);

impl FromStr for TargetSize {
    type Err = UnknownTargetSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTargetSize(s.to_string()))
    }
}

/// Where the caption band sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Horizontal band along the bottom edge.
    Bottom,
    /// Vertical strip along the right edge with rotated text, for extreme portraits.
    Right,
}

/// Split of the canvas into a photo area and a caption area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub mode: LayoutMode,
    pub image_area: Rect,
    pub text_area: Rect,
}

/// Resolved caption text. An empty string renders nothing for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionMetadata {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

/// Script class used to pick a font family for a run of caption text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Script {
    Cjk,
    Latin,
}

/// A script-homogeneous slice of caption text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub script: Script,
}
