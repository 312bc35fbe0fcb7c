//! # Photo Stamp
//!
//! Stamps personal photos with a white border and a one-line caption (date,
//! place, description) and exports them at fixed print sizes.
//!
//! # Architecture: One Render Pipeline
//!
//! Every output, from a quarter-scale preview to a 300 DPI print file, goes
//! through the same stateless pipeline:
//!
//! ```text
//! 1. Layout      target + source size  →  canvas, caption band, photo slot
//! 2. Placement   photo slot            →  photo rect clear of the band
//! 3. Bounds      placed bitmap         →  real content inside a white margin
//! 4. Caption     metadata + geometry   →  SVG text layer
//! 5. Compose     background + photo + text  →  encoded JPEG/PNG
//! ```
//!
//! All geometry is proportional to canvas height, so a preview is a faithful
//! scaled copy of the export. Batch export just loops the same render.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared geometry and caption types (`Rect`, `TargetSize`, `Layout`, …) |
//! | [`config`] | `stamp.toml` loading, merging over stock defaults, validation |
//! | [`layout`] | Canvas orientation and caption band split |
//! | [`placement`] | Contain-fit photo placement with band clearance |
//! | [`bounds`] | Raw-buffer detector for photos that already carry a white margin |
//! | [`typography`] | Font metrics, CJK/Latin runs, caption layout, SVG text layer |
//! | [`compose`] | [`StampEngine`](compose::StampEngine): the render contract and compositor |
//! | [`export`] | Batch export with per-item failure isolation and progress events |
//! | [`naming`] | Run directory and output file naming |
//! | [`imaging`] | Codec backend trait, `image`-crate backend, SVG rasterizer |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Configuration
//!
//! Every ratio and threshold lives in [`config::StampConfig`], an immutable
//! value owned by the engine. Two engines with different tunings can run side
//! by side in one process, and tests construct exactly the tuning they need.
//!
//! ## Vector Caption Layer
//!
//! The caption is emitted as SVG and rasterized with `resvg`. Text shaping,
//! font fallback and rotation for the vertical caption strip come from a
//! mature renderer instead of hand-placed glyphs, and the layer is easy to
//! inspect when a layout looks wrong.
//!
//! ## Best-Effort Detection
//!
//! Bounds detection never fails a render. Anything it cannot decide with
//! confidence falls back to the placement rect.

pub mod bounds;
pub mod compose;
pub mod config;
pub mod export;
pub mod imaging;
pub mod layout;
pub mod naming;
pub mod output;
pub mod placement;
pub mod types;
pub mod typography;

pub use compose::{RenderError, RenderOptions, StampEngine};
pub use export::{ExportEvent, ExportItem, ExportSummary};

#[cfg(test)]
pub(crate) mod test_helpers;
