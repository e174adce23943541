//! Numeral rasterization.
//!
//! Numerals are set in DejaVu Sans Bold, embedded in the binary, and
//! rasterized with [ab_glyph](https://docs.rs/ab_glyph) into a coverage mask
//! that the canvas composites in the numeral color (and, blurred, in the
//! shadow color).
//!
//! Sizes are CSS-style pixel sizes: `size` is the em height, so a 120px
//! numeral has digits about 87px tall.

use ab_glyph::{Font, FontRef, InvalidFont, PxScale, ScaleFont, point};

const NUMERAL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Parse the embedded numeral font.
pub fn numeral_font() -> Result<FontRef<'static>, InvalidFont> {
    FontRef::try_from_slice(NUMERAL_FONT)
}

/// Rasterized text: ink coverage in `0.0..=1.0` per pixel, row-major, cropped
/// to the ink bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    pub width: u32,
    pub height: u32,
    coverage: Vec<f32>,
}

impl TextMask {
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        self.coverage[(y * self.width + x) as usize]
    }
}

/// Em-sized pixel scale; ab_glyph scales by ascent-to-descent height.
fn em_scale<F: Font>(font: &F, size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units) if units > 0.0 => PxScale::from(size * font.height_unscaled() / units),
        _ => PxScale::from(size),
    }
}

/// Lay out and rasterize `text` on one line at `size` pixels.
///
/// Returns `None` when nothing would be inked.
pub fn rasterize<F: Font>(font: &F, text: &str, size: f32) -> Option<TextMask> {
    let scale = em_scale(font, size);
    let scaled = font.as_scaled(scale);

    let mut caret = 0.0;
    let mut previous = None;
    let mut outlines = Vec::new();
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        previous = Some(id);
        if let Some(outlined) = font.outline_glyph(glyph) {
            outlines.push(outlined);
        }
    }

    let first = outlines.first()?.px_bounds();
    let (mut min, mut max) = (first.min, first.max);
    for outlined in &outlines[1..] {
        let bounds = outlined.px_bounds();
        min.x = min.x.min(bounds.min.x);
        min.y = min.y.min(bounds.min.y);
        max.x = max.x.max(bounds.max.x);
        max.y = max.y.max(bounds.max.y);
    }
    let width = (max.x - min.x).ceil() as u32;
    let height = (max.y - min.y).ceil() as u32;
    if width == 0 || height == 0 {
        return None;
    }

    let mut coverage = vec![0.0f32; (width * height) as usize];
    for outlined in &outlines {
        // px_bounds are whole pixels, so the offsets are exact
        let bounds = outlined.px_bounds();
        let dx = (bounds.min.x - min.x) as u32;
        let dy = (bounds.min.y - min.y) as u32;
        outlined.draw(|x, y, c| {
            let (px, py) = (x + dx, y + dy);
            if px < width && py < height {
                let cell = &mut coverage[(py * width + px) as usize];
                *cell = (*cell + c).min(1.0);
            }
        });
    }

    Some(TextMask {
        width,
        height,
        coverage,
    })
}
