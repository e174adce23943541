//! Image reference utilities.
//!
//! Helpers for turning the raw image references scraped from an article into
//! the ordered candidate list handed to the distributor: validation, URL
//! normalization against the article URL, dropping page chrome (logos,
//! icons, ads, tracking pixels) and ranking by size hints in the URL.

use std::collections::HashSet;
use url::Url;

/// Extensions accepted as images, compared against the lowercased path.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif"];

/// URL fragments that mark an image as page chrome rather than content.
pub const UNWANTED_PATTERNS: &[&str] = &[
    "logo",
    "header",
    "footer",
    "banner",
    "ad",
    "ads",
    "advertisement",
    "social",
    "icon",
    "avatar",
    "sponsor",
    "promo",
    "widget",
    "button",
    "menu",
    "nav",
    "thumbnail",
    "placeholder",
    "pixel",
    "tracking",
];

/// Dimensions that only ever appear on icons.
pub const ICON_SIZES: &[&str] = &["16x16", "32x32", "64x64"];

/// Upper bound on content images kept after filtering.
pub const MAX_CONTENT_IMAGES: usize = 10;

/// Patterns this short only match a whole token ("ad" must not hit "header").
const WHOLE_TOKEN_MAX_LEN: usize = 3;

/// Whether `reference` looks like a usable image.
///
/// Accepts inline `data:image/` URIs and absolute HTTP(S) URLs whose path has
/// an image extension.
pub fn is_valid_image_url(reference: &str) -> bool {
    if reference.is_empty() {
        return false;
    }
    if reference
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image/"))
    {
        return true;
    }
    let Ok(url) = Url::parse(reference) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Host of an absolute URL.
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Resolve a scraped reference against the article it came from.
///
/// Absolute and inline references pass through; protocol-relative ones get
/// `https:`; root-relative and bare paths are joined to the article host.
/// When `base` is not a URL it is used as the host as is.
pub fn normalize_image_url(reference: &str, base: &str) -> String {
    if reference.is_empty()
        || reference.starts_with("http")
        || reference.starts_with("data:")
    {
        return reference.to_string();
    }
    if reference.starts_with("//") {
        return format!("https:{reference}");
    }

    let host = domain_of(base).unwrap_or_else(|| base.to_string());
    match reference.strip_prefix('/') {
        Some(path) => format!("https://{host}/{path}"),
        None => format!("https://{host}/{reference}"),
    }
}

fn is_unwanted(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    if ICON_SIZES.iter().any(|size| lower.contains(size)) {
        return true;
    }
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    UNWANTED_PATTERNS.iter().any(|pattern| {
        if pattern.len() <= WHOLE_TOKEN_MAX_LEN {
            tokens.contains(pattern)
        } else {
            lower.contains(pattern)
        }
    })
}

/// Drop page chrome and keep at most [`MAX_CONTENT_IMAGES`], in order.
pub fn filter_content_images(references: &[String]) -> Vec<String> {
    references
        .iter()
        .filter(|r| !is_unwanted(r))
        .take(MAX_CONTENT_IMAGES)
        .cloned()
        .collect()
}

/// Size score from dimension hints in the URL; larger is better.
pub fn relevance_score(reference: &str) -> u8 {
    fn has(text: &str, hints: &[&str]) -> bool {
        hints.iter().any(|h| text.contains(h))
    }

    let lower = reference.to_ascii_lowercase();
    if has(&lower, &["1200x", "1000x"]) {
        3
    } else if has(&lower, &["800x", "600x"]) {
        2
    } else if has(&lower, &["400x", "300x"]) {
        1
    } else {
        0
    }
}

/// Stable sort by [`relevance_score`], highest first.
pub fn sort_by_relevance(references: &mut [String]) {
    references.sort_by_key(|r| std::cmp::Reverse(relevance_score(r)));
}

/// Full pipeline from scraped references to distributor input.
///
/// Normalizes against `base` when given, drops duplicates (first occurrence
/// wins), then validates, filters and ranks.
pub fn extract_valid_images(candidates: &[String], base: Option<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let valid: Vec<String> = candidates
        .iter()
        .map(|r| match base {
            Some(base) => normalize_image_url(r.trim(), base),
            None => r.trim().to_string(),
        })
        .filter(|r| is_valid_image_url(r))
        .filter(|r| seen.insert(r.clone()))
        .collect();

    let mut kept = filter_content_images(&valid);
    sort_by_relevance(&mut kept);
    kept
}
