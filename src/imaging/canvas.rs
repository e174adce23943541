//! 2D drawing capability and shared types.
//!
//! The [`Canvas`] trait defines the four operations every drawing surface
//! must support: fill a rectangle, draw a scaled image region, draw centered
//! text with an optional shadow, and encode the result. A [`Renderer`]
//! creates a fresh canvas for every post image; surfaces are never reused.
//!
//! The production implementation is
//! [`RasterRenderer`](super::raster::RasterRenderer), which draws into an
//! RGBA pixel buffer.

use super::params::{Color, OutputFormat, Quality, Rect, TextStyle};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Trait for drawing surfaces.
///
/// Coordinates are in canvas pixels with the origin at the top-left corner.
/// Drawing outside the canvas is clipped. Colors with partial alpha are
/// composited over the existing pixels.
pub trait Canvas {
    /// Canvas dimensions as (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Fill a rectangle with a color.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw the `source` region of `image`, scaled to exactly `dest`.
    fn draw_image(&mut self, image: &DynamicImage, source: Rect, dest: Rect);

    /// Draw `text` centered on the canvas.
    fn draw_text(&mut self, text: &str, style: &TextStyle);

    /// Encode the current pixels.
    fn encode(&self, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, RenderError>;
}

/// Factory for drawing surfaces.
pub trait Renderer: Sync {
    type Canvas: Canvas;

    /// Create a blank canvas, or report that no surface is available.
    fn create_canvas(&self, width: u32, height: u32) -> Result<Self::Canvas, RenderError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock renderer whose canvases record operations without drawing.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockRenderer {
        pub operations: Arc<Mutex<Vec<RecordedOp>>>,
        /// Canvas sizes for which `create_canvas` fails.
        pub unavailable_sizes: Vec<(u32, u32)>,
        /// Fail every `encode` call.
        pub fail_encode: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Create {
            width: u32,
            height: u32,
        },
        FillRect {
            rect: Rect,
            color: Color,
        },
        DrawImage {
            image_width: u32,
            image_height: u32,
            source: Rect,
            dest: Rect,
        },
        DrawText {
            text: String,
            size: u32,
            color: Color,
            shadow: bool,
        },
        Encode {
            format: OutputFormat,
            quality: u32,
        },
    }

    pub struct RecordingCanvas {
        width: u32,
        height: u32,
        fail_encode: bool,
        operations: Arc<Mutex<Vec<RecordedOp>>>,
    }

    impl MockRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Renderer that cannot create any surface at all.
        pub fn unavailable(sizes: &[(u32, u32)]) -> Self {
            Self {
                unavailable_sizes: sizes.to_vec(),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Every string passed to `draw_text`, in call order.
        pub fn drawn_texts(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::DrawText { text, .. } => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    impl Renderer for MockRenderer {
        type Canvas = RecordingCanvas;

        fn create_canvas(&self, width: u32, height: u32) -> Result<RecordingCanvas, RenderError> {
            if self.unavailable_sizes.contains(&(width, height)) {
                return Err(RenderError::SurfaceUnavailable(format!(
                    "mock refuses {width}x{height}"
                )));
            }
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Create { width, height });
            Ok(RecordingCanvas {
                width,
                height,
                fail_encode: self.fail_encode,
                operations: Arc::clone(&self.operations),
            })
        }
    }

    impl Canvas for RecordingCanvas {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn fill_rect(&mut self, rect: Rect, color: Color) {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::FillRect { rect, color });
        }

        fn draw_image(&mut self, image: &DynamicImage, source: Rect, dest: Rect) {
            self.operations.lock().unwrap().push(RecordedOp::DrawImage {
                image_width: image.width(),
                image_height: image.height(),
                source,
                dest,
            });
        }

        fn draw_text(&mut self, text: &str, style: &TextStyle) {
            self.operations.lock().unwrap().push(RecordedOp::DrawText {
                text: text.to_string(),
                size: style.size,
                color: style.color,
                shadow: style.shadow.is_some(),
            });
        }

        fn encode(&self, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, RenderError> {
            if self.fail_encode {
                return Err(RenderError::SurfaceUnavailable("mock encode failure".into()));
            }
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                quality: quality.value(),
            });
            Ok(format!("mock:{}x{}", self.width, self.height).into_bytes())
        }
    }

    #[test]
    fn mock_records_canvas_lifecycle() {
        let renderer = MockRenderer::new();
        let mut canvas = renderer.create_canvas(1200, 675).unwrap();
        canvas.fill_rect(Rect::full(1200, 675), Color::WHITE);
        canvas.draw_text(
            "3",
            &TextStyle {
                size: 120,
                color: Color::WHITE,
                shadow: None,
            },
        );
        let bytes = canvas.encode(OutputFormat::Png, Quality::new(90)).unwrap();
        assert_eq!(bytes, b"mock:1200x675");

        let ops = renderer.get_operations();
        assert_eq!(ops.len(), 4);
        assert_eq!(
            ops[0],
            RecordedOp::Create {
                width: 1200,
                height: 675
            }
        );
        assert!(matches!(&ops[2], RecordedOp::DrawText { text, size: 120, .. } if text == "3"));
    }

    #[test]
    fn mock_refuses_configured_sizes() {
        let renderer = MockRenderer::unavailable(&[(600, 400)]);
        assert!(renderer.create_canvas(600, 400).is_err());
        assert!(renderer.create_canvas(1200, 675).is_ok());
    }

    #[test]
    fn mock_encode_failure() {
        let renderer = MockRenderer {
            fail_encode: true,
            ..MockRenderer::default()
        };
        let canvas = renderer.create_canvas(10, 10).unwrap();
        assert!(canvas.encode(OutputFormat::Jpeg, Quality::default()).is_err());
    }
}
