//! Numbered post image rendering, in pure Rust.
//!
//! | Layer | Implementation |
//! |---|---|
//! | **Cover-fit** | crop in source space, then `resize_exact` (Lanczos3) |
//! | **Overlay / flat fill** | per-pixel alpha blend |
//! | **Numeral** | embedded DejaVu Sans Bold, rasterized with `ab_glyph` |
//! | **Shadow** | numeral coverage mask, `imageops::blur`, offset composite |
//! | **Encode** | `image` JPEG / PNG encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Parameters**: Colors, rectangles, text styles, output formats
//! - **Canvas**: [`Canvas`] / [`Renderer`] traits + [`RasterRenderer`]
//! - **Generator**: [`NumberedImageGenerator`], combining the loader, a
//!   renderer and a [`RenderStyle`]

mod calculations;
pub mod canvas;
pub mod generator;
mod glyphs;
mod params;
pub mod raster;

pub use calculations::{blur_sigma, centered_origin, cover_crop, numeral_font_size, shadow_sigma};
pub use canvas::{Canvas, RenderError, Renderer};
pub use generator::{CanvasSpec, NumberedImageGenerator, RenderStyle, RenderedImage, numeral_for};
pub use params::{Color, OutputFormat, Quality, Rect, Shadow, TextStyle};
pub use raster::RasterRenderer;
