//! Image codec and rasterization collaborators, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Decode** (JPEG, PNG) | `image` crate decoders |
//! | **Resize** | Lanczos3 (`resize_exact` / `resize`) |
//! | **Encode** | `JpegEncoder` with quality, `PngEncoder` |
//! | **Caption layer** | `usvg` parse + `resvg` rasterize |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing codec operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **SVG raster**: [`TextRasterizer`] for the caption layer

pub mod backend;
pub mod calculations;
mod params;
pub mod rust_backend;
pub mod svg_raster;

pub use backend::{BackendError, ImageBackend};
pub use params::{EncodeParams, Fit, OutputFormat, Quality, SourceInput};
pub use rust_backend::RustBackend;
pub use svg_raster::TextRasterizer;
