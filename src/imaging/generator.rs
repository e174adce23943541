//! Numbered post image generation.
//!
//! Renders one image per call, in layers:
//!
//! ```text
//! with base image:     cover-fit base → dark overlay → numeral
//! without base image:  palette color  → numeral
//! base unavailable:    palette color  → numeral   (warning, not an error)
//! primary render fails:  small flat fallback tile, no shadow
//! ```
//!
//! The numeral is always `post_index + 1`. The background color of a flat
//! tile depends only on the post index.

use super::calculations::{cover_crop, numeral_font_size};
use super::canvas::{Canvas, RenderError, Renderer};
use super::params::{Color, OutputFormat, Quality, Rect, Shadow, TextStyle};
use crate::config::{Config, ConfigError, parse_color};
use crate::data_uri;
use crate::loader::ImageLoader;
use tracing::{debug, warn};

/// A rendered post image, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    /// Self-contained `data:` URI for the image.
    pub fn to_data_uri(&self) -> String {
        data_uri::encode(self.format.mime_type(), &self.bytes)
    }
}

/// Size, encoding and numeral size of one kind of canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
    /// Numeral size as a fraction of the canvas height.
    pub numeral_ratio: f32,
}

/// Everything that determines how a post image looks.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub canvas: CanvasSpec,
    pub fallback: CanvasSpec,
    pub palette: Vec<Color>,
    pub overlay: Color,
    pub numeral_color: Color,
    pub shadow: Option<Shadow>,
}

impl RenderStyle {
    /// Build a style from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let palette = config
            .palette
            .colors
            .iter()
            .map(|hex| parse_color("palette.colors", hex))
            .collect::<Result<Vec<_>, _>>()?;
        if palette.is_empty() {
            return Err(ConfigError::Validation(
                "palette.colors must not be empty".into(),
            ));
        }
        let shadow = &config.numeral.shadow;
        let shadow_color =
            parse_color("numeral.shadow.color", &shadow.color)?.with_opacity(shadow.opacity);

        Ok(Self {
            canvas: CanvasSpec {
                width: config.canvas.width,
                height: config.canvas.height,
                format: config.canvas.format,
                quality: Quality::new(config.canvas.quality),
                numeral_ratio: config.numeral.size_ratio,
            },
            fallback: CanvasSpec {
                width: config.fallback.width,
                height: config.fallback.height,
                format: OutputFormat::Jpeg,
                quality: Quality::new(config.fallback.quality),
                numeral_ratio: config.fallback.numeral_ratio,
            },
            palette,
            overlay: parse_color("overlay.color", &config.overlay.color)?
                .with_opacity(config.overlay.opacity),
            numeral_color: parse_color("numeral.color", &config.numeral.color)?,
            // A fully transparent shadow draws nothing
            shadow: (shadow_color.a > 0).then_some(Shadow {
                color: shadow_color,
                offset_x: shadow.offset_x,
                offset_y: shadow.offset_y,
                blur: shadow.blur,
            }),
        })
    }

    /// Flat tile background for a post. An empty palette gives black.
    pub fn color_for_index(&self, post_index: usize) -> Color {
        match self.palette.len() {
            0 => Color::BLACK,
            len => self.palette[post_index % len],
        }
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::from_config(&Config::default()).expect("default config must produce a valid style")
    }
}

/// The 1-based numeral shown on a post.
pub fn numeral_for(post_index: usize) -> String {
    (post_index + 1).to_string()
}

/// Renders numbered post images.
///
/// Stateless across calls: each call creates and drops its own canvas, so
/// one generator can be shared by reference between rayon workers.
pub struct NumberedImageGenerator<L, R> {
    loader: L,
    renderer: R,
    style: RenderStyle,
}

impl<L: ImageLoader, R: Renderer> NumberedImageGenerator<L, R> {
    pub fn new(loader: L, renderer: R, style: RenderStyle) -> Self {
        Self {
            loader,
            renderer,
            style,
        }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Render the image for `post_index`, over `base` when given.
    ///
    /// An unavailable base image degrades to a flat tile. Any failure of the
    /// primary render degrades to the small fallback tile. Only when no
    /// surface can be produced at all is an error returned.
    pub fn generate(
        &self,
        post_index: usize,
        base: Option<&str>,
    ) -> Result<RenderedImage, RenderError> {
        match self.render_primary(post_index, base) {
            Ok(image) => Ok(image),
            Err(err) => {
                warn!(post = post_index + 1, error = %err, "primary render failed, using fallback tile");
                self.render_fallback(post_index)
            }
        }
    }

    fn render_primary(
        &self,
        post_index: usize,
        base: Option<&str>,
    ) -> Result<RenderedImage, RenderError> {
        let spec = self.style.canvas;
        let mut canvas = self.renderer.create_canvas(spec.width, spec.height)?;

        match base {
            Some(reference) => match self.loader.load(reference) {
                Ok(image) => {
                    let crop = cover_crop((image.width(), image.height()), (spec.width, spec.height));
                    canvas.draw_image(&image, crop, Rect::full(spec.width, spec.height));
                    canvas.fill_rect(Rect::full(spec.width, spec.height), self.style.overlay);
                    debug!(post = post_index + 1, "drew overlay on base image");
                }
                Err(err) => {
                    warn!(
                        post = post_index + 1,
                        reference = %truncate_reference(reference),
                        error = %err,
                        "base image unavailable, using flat tile"
                    );
                    self.fill_background(&mut canvas, post_index);
                }
            },
            None => self.fill_background(&mut canvas, post_index),
        }

        self.draw_numeral(&mut canvas, post_index, spec, self.style.shadow);
        finish(canvas, spec)
    }

    fn render_fallback(&self, post_index: usize) -> Result<RenderedImage, RenderError> {
        let spec = self.style.fallback;
        let mut canvas = self.renderer.create_canvas(spec.width, spec.height)?;
        self.fill_background(&mut canvas, post_index);
        self.draw_numeral(&mut canvas, post_index, spec, None);
        finish(canvas, spec)
    }

    fn fill_background(&self, canvas: &mut R::Canvas, post_index: usize) {
        let (width, height) = canvas.dimensions();
        canvas.fill_rect(Rect::full(width, height), self.style.color_for_index(post_index));
    }

    fn draw_numeral(
        &self,
        canvas: &mut R::Canvas,
        post_index: usize,
        spec: CanvasSpec,
        shadow: Option<Shadow>,
    ) {
        let style = TextStyle {
            size: numeral_font_size(spec.height, spec.numeral_ratio),
            color: self.style.numeral_color,
            shadow,
        };
        canvas.draw_text(&numeral_for(post_index), &style);
    }
}

fn finish<C: Canvas>(canvas: C, spec: CanvasSpec) -> Result<RenderedImage, RenderError> {
    let (width, height) = canvas.dimensions();
    let bytes = canvas.encode(spec.format, spec.quality)?;
    Ok(RenderedImage {
        bytes,
        format: spec.format,
        width,
        height,
    })
}

/// Data URIs can be megabytes long; keep log lines readable.
fn truncate_reference(reference: &str) -> &str {
    match reference.char_indices().nth(96) {
        Some((end, _)) => &reference[..end],
        None => reference,
    }
}
