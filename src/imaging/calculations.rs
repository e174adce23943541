//! Pure calculation functions for post image geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Rect;

/// Calculate the region of a source image that remains visible when it is
/// scaled to *cover* a target area and centered.
///
/// The scale factor is `max(target_w / src_w, target_h / src_h)`, so the
/// target is always completely filled and the overflow on one axis is
/// cropped evenly from both sides. Never letterboxes.
///
/// # Arguments
/// * `source` - Source image dimensions (width, height), both non-zero
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * Crop rectangle in source pixel coordinates. Scaling this rectangle to
///   `target` reproduces the cover placement.
///
/// # Examples
/// ```
/// # use threadcards::imaging::{Rect, cover_crop};
/// // 16:9 target from a square source: full width, centered band
/// assert_eq!(cover_crop((1000, 1000), (1200, 675)), Rect::new(0, 218, 1000, 563));
/// ```
pub fn cover_crop(source: (u32, u32), target: (u32, u32)) -> Rect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = f64::max(
        tgt_w as f64 / src_w as f64,
        tgt_h as f64 / src_h as f64,
    );

    // Visible portion of the source, clamped so rounding never overruns it
    let visible_w = ((tgt_w as f64 / scale).round() as u32).clamp(1, src_w);
    let visible_h = ((tgt_h as f64 / scale).round() as u32).clamp(1, src_h);

    Rect {
        x: (src_w - visible_w) / 2,
        y: (src_h - visible_h) / 2,
        width: visible_w,
        height: visible_h,
    }
}

/// Font size for a numeral as a fraction of the canvas height.
///
/// Never smaller than one pixel.
pub fn numeral_font_size(canvas_height: u32, size_ratio: f32) -> u32 {
    ((canvas_height as f32 * size_ratio).round() as u32).max(1)
}

/// Top-left origin that centers a `content` box inside a `container` box.
///
/// Content larger than the container is pinned to the origin.
pub fn centered_origin(container: (u32, u32), content: (u32, u32)) -> (u32, u32) {
    (
        container.0.saturating_sub(content.0) / 2,
        container.1.saturating_sub(content.1) / 2,
    )
}

/// Gaussian sigma for a canvas-style shadow blur radius.
pub fn blur_sigma(blur: f32) -> f32 {
    (blur / 2.0).max(0.0)
}

/// Shadow sigma for a canvas, capped so the blur margin (3σ) never exceeds
/// the canvas' longer side.
pub fn shadow_sigma(blur: f32, canvas: (u32, u32)) -> f32 {
    let limit = canvas.0.max(canvas.1) as f32 / 3.0;
    blur_sigma(blur).min(limit)
}
