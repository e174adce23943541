//! Raster drawing backend on an in-memory RGBA buffer.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Surface | `image::RgbaImage` |
//! | Fill (with alpha) | `image::Pixel::blend` per pixel |
//! | Scaled image | `DynamicImage::crop_imm` + `resize_exact` (`Lanczos3`) + `imageops::overlay` |
//! | Text | embedded DejaVu Sans Bold via `ab_glyph` ([`glyphs`](super::glyphs)), coverage-blended |
//! | Text shadow | coverage mask on a transparent layer, `imageops::blur` + `imageops::overlay` |
//! | Encode → JPEG / PNG | `image::codecs::jpeg::JpegEncoder`, `image::codecs::png::PngEncoder` |

use super::calculations::{centered_origin, shadow_sigma};
use super::canvas::{Canvas, RenderError, Renderer};
use super::glyphs::{self, TextMask};
use super::params::{Color, OutputFormat, Quality, Rect, Shadow, TextStyle};
use ab_glyph::FontRef;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Pixel, Rgba, RgbaImage};

/// Largest surface the renderer will allocate (width × height).
const MAX_PIXELS: u64 = 40_000_000;

/// Renderer producing [`RasterCanvas`] surfaces.
pub struct RasterRenderer;

impl RasterRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for RasterRenderer {
    type Canvas = RasterCanvas;

    fn create_canvas(&self, width: u32, height: u32) -> Result<RasterCanvas, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::SurfaceUnavailable(format!(
                "invalid canvas size {width}x{height}"
            )));
        }
        if width as u64 * height as u64 > MAX_PIXELS {
            return Err(RenderError::SurfaceUnavailable(format!(
                "canvas {width}x{height} exceeds {MAX_PIXELS} pixels"
            )));
        }
        let font = glyphs::numeral_font()
            .map_err(|err| RenderError::SurfaceUnavailable(format!("numeral font: {err}")))?;
        Ok(RasterCanvas {
            pixels: RgbaImage::new(width, height),
            font,
        })
    }
}

/// A drawing surface backed by an RGBA pixel buffer.
pub struct RasterCanvas {
    pixels: RgbaImage,
    font: FontRef<'static>,
}

impl RasterCanvas {
    /// Clip a rectangle to the canvas, returning `None` when nothing remains.
    fn clip(&self, rect: Rect) -> Option<Rect> {
        let (w, h) = self.pixels.dimensions();
        let x_end = rect.x.saturating_add(rect.width).min(w);
        let y_end = rect.y.saturating_add(rect.height).min(h);
        (rect.x < x_end && rect.y < y_end)
            .then(|| Rect::new(rect.x, rect.y, x_end - rect.x, y_end - rect.y))
    }

    /// Composite `mask` in `color` with its top-left corner at `(x, y)`.
    fn blend_mask(&mut self, mask: &TextMask, x: u32, y: u32, color: Color) {
        let (w, h) = self.pixels.dimensions();
        for my in 0..mask.height {
            for mx in 0..mask.width {
                let (px, py) = (x + mx, y + my);
                let coverage = mask.coverage(mx, my);
                if px >= w || py >= h || coverage <= 0.0 {
                    continue;
                }
                let alpha = (color.a as f32 * coverage).round() as u8;
                let ink = Rgba([color.r, color.g, color.b, alpha]);
                if alpha == u8::MAX {
                    self.pixels.put_pixel(px, py, ink);
                } else {
                    self.pixels.get_pixel_mut(px, py).blend(&ink);
                }
            }
        }
    }

    fn draw_shadow(&mut self, mask: &TextMask, origin: (u32, u32), shadow: &Shadow) {
        let sigma = shadow_sigma(shadow.blur, self.pixels.dimensions());
        let margin = (sigma * 3.0).ceil() as u32;

        let mut layer = RgbaImage::new(mask.width + 2 * margin, mask.height + 2 * margin);
        let color = shadow.color;
        for y in 0..mask.height {
            for x in 0..mask.width {
                let alpha = (color.a as f32 * mask.coverage(x, y)).round() as u8;
                if alpha > 0 {
                    layer.put_pixel(x + margin, y + margin, Rgba([color.r, color.g, color.b, alpha]));
                }
            }
        }
        let layer = if sigma > 0.0 {
            imageops::blur(&layer, sigma)
        } else {
            layer
        };

        let x = origin.0 as i64 - margin as i64 + shadow.offset_x as i64;
        let y = origin.1 as i64 - margin as i64 + shadow.offset_y as i64;
        imageops::overlay(&mut self.pixels, &layer, x, y);
    }
}

impl Canvas for RasterCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = self.clip(rect) else { return };
        let rgba = color.to_rgba();
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                if color.is_opaque() {
                    self.pixels.put_pixel(x, y, rgba);
                } else {
                    self.pixels.get_pixel_mut(x, y).blend(&rgba);
                }
            }
        }
    }

    fn draw_image(&mut self, image: &DynamicImage, source: Rect, dest: Rect) {
        if source.width == 0 || source.height == 0 || dest.width == 0 || dest.height == 0 {
            return;
        }
        let scaled = image
            .crop_imm(source.x, source.y, source.width, source.height)
            .resize_exact(dest.width, dest.height, FilterType::Lanczos3)
            .to_rgba8();
        imageops::overlay(&mut self.pixels, &scaled, dest.x as i64, dest.y as i64);
    }

    fn draw_text(&mut self, text: &str, style: &TextStyle) {
        let Some(mask) = glyphs::rasterize(&self.font, text, style.size as f32) else {
            return;
        };
        let origin = centered_origin(self.pixels.dimensions(), (mask.width, mask.height));

        if let Some(shadow) = &style.shadow {
            self.draw_shadow(&mask, origin, shadow);
        }
        self.blend_mask(&mask, origin.0, origin.1, style.color);
    }

    fn encode(&self, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, RenderError> {
        let (width, height) = self.pixels.dimensions();
        let mut buffer = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut buffer, quality.value() as u8).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            OutputFormat::Png => {
                PngEncoder::new(&mut buffer).write_image(
                    self.pixels.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )?;
            }
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn opaque_canvas(width: u32, height: u32, color: Color) -> RasterCanvas {
        let mut canvas = RasterRenderer::new().create_canvas(width, height).unwrap();
        canvas.fill_rect(Rect::full(width, height), color);
        canvas
    }

    fn pixel(canvas: &RasterCanvas, x: u32, y: u32) -> [u8; 4] {
        canvas.pixels.get_pixel(x, y).0
    }

    #[test]
    fn create_canvas_rejects_zero_and_huge_sizes() {
        let renderer = RasterRenderer::new();
        assert!(renderer.create_canvas(0, 10).is_err());
        assert!(renderer.create_canvas(10, 0).is_err());
        assert!(renderer.create_canvas(100_000, 100_000).is_err());
        assert_eq!(
            renderer.create_canvas(1200, 675).unwrap().dimensions(),
            (1200, 675)
        );
    }

    #[test]
    fn fill_rect_opaque_replaces_pixels() {
        let canvas = opaque_canvas(20, 10, Color::rgb(0x29, 0xab, 0x87));
        assert_eq!(pixel(&canvas, 0, 0), [0x29, 0xab, 0x87, 255]);
        assert_eq!(pixel(&canvas, 19, 9), [0x29, 0xab, 0x87, 255]);
    }

    #[test]
    fn fill_rect_translucent_darkens() {
        let mut canvas = opaque_canvas(4, 4, Color::WHITE);
        canvas.fill_rect(Rect::full(4, 4), Color::BLACK.with_opacity(0.6));
        let [r, g, b, a] = pixel(&canvas, 1, 1);
        assert_eq!(a, 255);
        assert!((100..=104).contains(&r), "got {r}");
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn fill_rect_is_clipped() {
        let mut canvas = opaque_canvas(10, 10, Color::WHITE);
        canvas.fill_rect(Rect::new(8, 8, 50, 50), Color::BLACK);
        canvas.fill_rect(Rect::new(20, 20, 5, 5), Color::BLACK);
        assert_eq!(pixel(&canvas, 9, 9), [0, 0, 0, 255]);
        assert_eq!(pixel(&canvas, 7, 7), [255, 255, 255, 255]);
    }

    #[test]
    fn draw_image_scales_region_to_destination() {
        // Left half red, right half blue; draw only the right half
        let source = RgbImage::from_fn(40, 20, |x, _| {
            if x < 20 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });
        let image = DynamicImage::ImageRgb8(source);

        let mut canvas = opaque_canvas(100, 50, Color::WHITE);
        canvas.draw_image(&image, Rect::new(20, 0, 20, 20), Rect::full(100, 50));

        let [r, _, b, _] = pixel(&canvas, 50, 25);
        assert!(b > 200 && r < 50, "expected blue, got r={r} b={b}");
    }

    /// Bounding box of pure-white pixels as (min_x, min_y, max_x, max_y).
    fn white_bounds(canvas: &RasterCanvas) -> Option<(u32, u32, u32, u32)> {
        canvas
            .pixels
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 == [255, 255, 255, 255])
            .fold(None, |acc, (x, y, _)| match acc {
                None => Some((x, y, x, y)),
                Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
            })
    }

    #[test]
    fn draw_text_centers_white_numeral() {
        let mut canvas = opaque_canvas(200, 100, Color::BLACK);
        canvas.draw_text(
            "8",
            &TextStyle {
                size: 70,
                color: Color::WHITE,
                shadow: None,
            },
        );
        let (x0, y0, x1, y1) = white_bounds(&canvas).expect("numeral was not drawn");
        let (cx, cy) = ((x0 + x1) / 2, (y0 + y1) / 2);
        assert!(cx.abs_diff(100) <= 3, "center x={cx}");
        assert!(cy.abs_diff(50) <= 3, "center y={cy}");
        // Digits are about 0.73 em tall
        assert!((45..=56).contains(&(y1 - y0)), "height={}", y1 - y0);
        assert_eq!(pixel(&canvas, 5, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn draw_text_edges_are_antialiased() {
        let mut canvas = opaque_canvas(200, 100, Color::BLACK);
        canvas.draw_text(
            "0",
            &TextStyle {
                size: 70,
                color: Color::WHITE,
                shadow: None,
            },
        );
        let grey = canvas
            .pixels
            .pixels()
            .filter(|p| p.0[0] > 0 && p.0[0] < 255)
            .count();
        assert!(grey > 0, "no partially covered pixels");
    }

    #[test]
    fn draw_text_shadow_darkens_around_glyph() {
        let mut canvas = opaque_canvas(200, 100, Color::WHITE);
        canvas.draw_text(
            "8",
            &TextStyle {
                size: 70,
                color: Color::WHITE,
                shadow: Some(Shadow::soft()),
            },
        );
        let darkest = canvas.pixels.pixels().map(|p| p.0[0]).min().unwrap();
        assert!(darkest < 200, "no visible shadow, darkest={darkest}");
        assert_eq!(pixel(&canvas, 0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn oversized_shadow_blur_is_bounded_by_canvas() {
        let mut canvas = opaque_canvas(60, 40, Color::WHITE);
        canvas.draw_text(
            "8",
            &TextStyle {
                size: 10,
                color: Color::WHITE,
                shadow: Some(Shadow {
                    blur: 100_000.0,
                    ..Shadow::soft()
                }),
            },
        );
        assert_eq!(canvas.dimensions(), (60, 40));
    }

    #[test]
    fn draw_text_without_ink_is_noop() {
        let mut canvas = opaque_canvas(20, 20, Color::BLACK);
        canvas.draw_text(
            "",
            &TextStyle {
                size: 10,
                color: Color::WHITE,
                shadow: Some(Shadow::soft()),
            },
        );
        assert!(canvas.pixels.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn encode_jpeg_decodes_with_same_dimensions() {
        let canvas = opaque_canvas(120, 67, Color::rgb(0x25, 0x63, 0xeb));
        let bytes = canvas.encode(OutputFormat::Jpeg, Quality::new(80)).unwrap();
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (120, 67));
    }

    #[test]
    fn encode_png_is_lossless() {
        let canvas = opaque_canvas(8, 8, Color::rgb(0xdb, 0x27, 0x77));
        let bytes = canvas.encode(OutputFormat::Png, Quality::default()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 3).0, [0xdb, 0x27, 0x77, 255]);
    }
}
