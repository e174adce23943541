//! CLI output formatting for every command.
//!
//! # Post-First Display
//!
//! Every line is keyed by the post it belongs to: a 3-digit, 1-based
//! positional index followed by what that post shows. References are
//! secondary and truncated, since inline data URIs run to megabytes.
//!
//! # Output Format
//!
//! ## Distribute
//!
//! ```text
//! Distribution: single image (overlay)
//! 001 original https://example.com/hero.jpg
//! 002 rendered 1200x675 jpeg → post-002.jpg
//! 003 empty
//!
//! Coverage: 2/3 posts, 2 unique images, 67%
//! ```
//!
//! ## Stats
//!
//! ```text
//! Case: more posts than images
//!     more posts than images, extra posts get overlays on the first image
//! 001 original https://example.com/a.jpg
//! 002 overlay https://example.com/b.jpg
//! 003 overlay https://example.com/a.jpg
//! ```
//!
//! ## Filter
//!
//! ```text
//! 001 https://example.com/hero-1200x675.jpg (relevance 3)
//! 002 https://example.com/inline.jpg (relevance 0)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::distribute::{
    Distribution, DistributionCase, ImageCoverage, MidSequence, SlotImage, Treatment,
    treatment_for,
};
use crate::imaging::OutputFormat;
use crate::references::relevance_score;

/// Longest reference shown before truncation.
const MAX_REFERENCE_DISPLAY: usize = 72;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 0-based post index as a 3-digit, zero-padded, 1-based position.
fn format_index(post_index: usize) -> String {
    format!("{:0>3}", post_index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_reference(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn policy_label(policy: MidSequence) -> &'static str {
    match policy {
        MidSequence::Overlay => "overlay",
        MidSequence::Verbatim => "verbatim",
    }
}

/// File name for a rendered post image: `post-001.jpg`.
pub fn post_file_name(post_index: usize, format: OutputFormat) -> String {
    format!("post-{}.{}", format_index(post_index), format.extension())
}

// ============================================================================
// Distribute
// ============================================================================

pub fn format_coverage(coverage: &ImageCoverage) -> String {
    format!(
        "Coverage: {}/{} posts, {} unique images, {}%",
        coverage.posts_with_images,
        coverage.total_posts,
        coverage.unique_images,
        coverage.coverage_percent
    )
}

pub fn format_distribution(
    distribution: &Distribution,
    coverage: &ImageCoverage,
    case: DistributionCase,
    policy: MidSequence,
) -> Vec<String> {
    let mut lines = vec![format!("Distribution: {} ({})", case, policy_label(policy))];

    for (i, slot) in distribution.slots.iter().enumerate() {
        let line = match slot {
            SlotImage::Source(reference) => format!(
                "{} original {}",
                format_index(i),
                truncate_reference(reference, MAX_REFERENCE_DISPLAY)
            ),
            SlotImage::Rendered(image) => format!(
                "{} rendered {}x{} {} → {}",
                format_index(i),
                image.width,
                image.height,
                image.format.extension(),
                post_file_name(i, image.format)
            ),
            SlotImage::Empty => format!("{} empty", format_index(i)),
        };
        lines.push(line);
    }

    lines.push(String::new());
    lines.push(format_coverage(coverage));
    lines
}

pub fn print_distribution(
    distribution: &Distribution,
    coverage: &ImageCoverage,
    case: DistributionCase,
    policy: MidSequence,
) {
    for line in format_distribution(distribution, coverage, case, policy) {
        println!("{}", line);
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Planned treatment per post, without rendering anything.
pub fn format_stats(images: &[String], post_count: usize, policy: MidSequence) -> Vec<String> {
    let case = DistributionCase::classify(images.len(), post_count);
    let mut lines = vec![
        format!("Case: {}", case),
        format!("{}{}", indent(1), case.description(policy)),
    ];

    for i in 0..post_count {
        let line = match treatment_for(i, images, policy) {
            Treatment::FlatTile => format!("{} tile", format_index(i)),
            Treatment::Verbatim(reference) => format!(
                "{} original {}",
                format_index(i),
                truncate_reference(reference, MAX_REFERENCE_DISPLAY)
            ),
            Treatment::Overlay(reference) => format!(
                "{} overlay {}",
                format_index(i),
                truncate_reference(reference, MAX_REFERENCE_DISPLAY)
            ),
        };
        lines.push(line);
    }
    lines
}

pub fn print_stats(images: &[String], post_count: usize, policy: MidSequence) {
    for line in format_stats(images, post_count, policy) {
        println!("{}", line);
    }
}

// ============================================================================
// Filter
// ============================================================================

pub fn format_filter(kept: &[String]) -> Vec<String> {
    if kept.is_empty() {
        return vec!["No content images".to_string()];
    }
    kept.iter()
        .enumerate()
        .map(|(i, reference)| {
            format!(
                "{} {} (relevance {})",
                format_index(i),
                truncate_reference(reference, MAX_REFERENCE_DISPLAY),
                relevance_score(reference)
            )
        })
        .collect()
}

pub fn print_filter(kept: &[String]) {
    for line in format_filter(kept) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RenderedImage;

    fn strings(refs: &[&str]) -> Vec<String> {
        refs.iter().map(|r| r.to_string()).collect()
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_is_one_based() {
        assert_eq!(format_index(0), "001");
        assert_eq!(format_index(41), "042");
    }

    #[test]
    fn truncate_short() {
        assert_eq!(truncate_reference("https://x/a.jpg", 40), "https://x/a.jpg");
    }

    #[test]
    fn truncate_long() {
        let text = "a".repeat(50);
        assert_eq!(
            truncate_reference(&text, 40),
            format!("{}...", "a".repeat(40))
        );
    }

    #[test]
    fn file_names() {
        assert_eq!(post_file_name(0, OutputFormat::Jpeg), "post-001.jpg");
        assert_eq!(post_file_name(11, OutputFormat::Png), "post-012.png");
    }

    // =========================================================================
    // Distribute
    // =========================================================================

    #[test]
    fn distribution_lines() {
        let distribution = Distribution {
            slots: vec![
                SlotImage::Source("https://example.com/hero.jpg".into()),
                SlotImage::Rendered(RenderedImage {
                    bytes: vec![0],
                    format: OutputFormat::Jpeg,
                    width: 1200,
                    height: 675,
                }),
                SlotImage::Empty,
            ],
        };
        let lines = format_distribution(
            &distribution,
            &distribution.coverage(),
            DistributionCase::SingleImage,
            MidSequence::Overlay,
        );
        assert_eq!(
            lines,
            vec![
                "Distribution: single image (overlay)",
                "001 original https://example.com/hero.jpg",
                "002 rendered 1200x675 jpg → post-002.jpg",
                "003 empty",
                "",
                "Coverage: 2/3 posts, 2 unique images, 67%",
            ]
        );
    }

    #[test]
    fn data_uri_sources_are_truncated() {
        let uri = format!("data:image/png;base64,{}", "A".repeat(400));
        let distribution = Distribution {
            slots: vec![SlotImage::Source(uri)],
        };
        let lines = format_distribution(
            &distribution,
            &distribution.coverage(),
            DistributionCase::SufficientImages,
            MidSequence::Verbatim,
        );
        assert!(lines[1].ends_with("..."));
        assert!(lines[1].len() < 100);
    }

    // =========================================================================
    // Stats
    // =========================================================================

    #[test]
    fn stats_lines_follow_treatments() {
        let images = strings(&["https://x/a.jpg", "https://x/b.jpg"]);
        let lines = format_stats(&images, 3, MidSequence::Overlay);
        assert_eq!(lines[0], "Case: more posts than images");
        assert!(lines[1].starts_with("    "));
        assert_eq!(
            &lines[2..],
            &[
                "001 original https://x/a.jpg",
                "002 overlay https://x/b.jpg",
                "003 overlay https://x/a.jpg",
            ]
        );
    }

    #[test]
    fn stats_without_images_are_tiles() {
        let lines = format_stats(&[], 2, MidSequence::Verbatim);
        assert_eq!(lines[0], "Case: no images");
        assert_eq!(&lines[2..], &["001 tile", "002 tile"]);
    }

    #[test]
    fn stats_verbatim_policy() {
        let images = strings(&["a", "b"]);
        let lines = format_stats(&images, 2, MidSequence::Verbatim);
        assert_eq!(&lines[2..], &["001 original a", "002 original b"]);
    }

    // =========================================================================
    // Filter
    // =========================================================================

    #[test]
    fn filter_lines_show_relevance() {
        let lines = format_filter(&strings(&["https://x/hero-1200x675.jpg", "https://x/b.jpg"]));
        assert_eq!(
            lines,
            vec![
                "001 https://x/hero-1200x675.jpg (relevance 3)",
                "002 https://x/b.jpg (relevance 0)",
            ]
        );
    }

    #[test]
    fn filter_empty() {
        assert_eq!(format_filter(&[]), vec!["No content images"]);
    }
}
