//! Image distribution across the posts of a thread.
//!
//! Given the source images extracted from an article and the number of
//! posts, decide what each post shows and render whatever needs rendering.
//!
//! ## Rules
//!
//! Evaluated per post index `i`, first match wins:
//!
//! | # | Condition | Treatment |
//! |---|---|---|
//! | 1 | no source images | flat numbered tile |
//! | 2 | `i == 0` | `images[0]`, unmodified |
//! | 3 | `i < images.len()` | numbered overlay on `images[i]` ([`MidSequence::Overlay`]) or `images[i]` unmodified ([`MidSequence::Verbatim`]) |
//! | 4 | otherwise | numbered overlay on `images[0]` |
//!
//! The lead post always carries a clean hero image.
//!
//! ## Failure isolation
//!
//! Every post is handled on its own. A render failure for an overlay falls
//! back to a flat tile for that post only; if that fails as well, the post
//! gets [`SlotImage::Empty`]. The result always has one slot per post.
//!
//! ## Parallel rendering
//!
//! Posts are rendered in parallel using [rayon](https://docs.rs/rayon); the
//! result is ordered by post index regardless of completion order.

use crate::imaging::{NumberedImageGenerator, RenderedImage, Renderer};
use crate::loader::ImageLoader;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info};

/// Treatment of posts after the first that have a source image of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MidSequence {
    /// Numbered overlay on the post's own image.
    #[default]
    Overlay,
    /// The post's own image, unmodified.
    Verbatim,
}

/// What a post receives, before any rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment<'a> {
    FlatTile,
    Verbatim(&'a str),
    Overlay(&'a str),
}

/// Decide the treatment for one post. Pure; no I/O.
pub fn treatment_for(post_index: usize, images: &[String], policy: MidSequence) -> Treatment<'_> {
    match images.first() {
        None => Treatment::FlatTile,
        Some(first) if post_index == 0 => Treatment::Verbatim(first),
        Some(_) if post_index < images.len() => match policy {
            MidSequence::Overlay => Treatment::Overlay(&images[post_index]),
            MidSequence::Verbatim => Treatment::Verbatim(&images[post_index]),
        },
        Some(first) => Treatment::Overlay(first),
    }
}

/// One post's image in a finished distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotImage {
    /// A source image reference, passed through unchanged.
    Source(String),
    /// A synthesized image.
    Rendered(RenderedImage),
    /// Rendering failed and no fallback succeeded.
    Empty,
}

impl SlotImage {
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotImage::Empty)
    }

    /// Reference form: the source string, a data URI, or `""` when empty.
    pub fn to_reference(&self) -> String {
        match self {
            SlotImage::Source(reference) => reference.clone(),
            SlotImage::Rendered(image) => image.to_data_uri(),
            SlotImage::Empty => String::new(),
        }
    }
}

/// Per-post images, index-aligned with the posts of the thread.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Distribution {
    pub slots: Vec<SlotImage>,
}

impl Distribution {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every slot in reference form (see [`SlotImage::to_reference`]).
    pub fn to_references(&self) -> Vec<String> {
        self.slots.iter().map(SlotImage::to_reference).collect()
    }

    /// How many posts ended up with an image, and how varied they are.
    ///
    /// Sources are told apart by reference, rendered images by their bytes.
    pub fn coverage(&self) -> ImageCoverage {
        #[derive(PartialEq, Eq, Hash)]
        enum Identity<'a> {
            Source(&'a str),
            Rendered(&'a [u8]),
        }

        let filled: Vec<Identity<'_>> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                SlotImage::Source(reference) => Some(Identity::Source(reference)),
                SlotImage::Rendered(image) => Some(Identity::Rendered(&image.bytes)),
                SlotImage::Empty => None,
            })
            .collect();
        let unique: HashSet<&Identity<'_>> = filled.iter().collect();
        let total = self.slots.len();

        ImageCoverage {
            total_posts: total,
            posts_with_images: filled.len(),
            unique_images: unique.len(),
            coverage_percent: if total == 0 {
                0
            } else {
                ((filled.len() as f64 / total as f64) * 100.0).round() as u32
            },
        }
    }
}

/// Image coverage of a finished distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageCoverage {
    pub total_posts: usize,
    pub posts_with_images: usize,
    pub unique_images: usize,
    /// Rounded percentage of posts with an image; 0 for an empty thread.
    pub coverage_percent: u32,
}

/// Diagnostic label for a distribution run.
///
/// Derived from the counts alone; it describes the run and never steers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionCase {
    NoImages,
    SingleImage,
    SufficientImages,
    MorePostsThanImages,
}

impl DistributionCase {
    pub fn classify(available: usize, posts: usize) -> Self {
        if available == 0 {
            DistributionCase::NoImages
        } else if available == 1 && posts > 1 {
            DistributionCase::SingleImage
        } else if available >= posts {
            DistributionCase::SufficientImages
        } else {
            DistributionCase::MorePostsThanImages
        }
    }

    /// Human description of what the run produces under `policy`.
    pub fn description(self, policy: MidSequence) -> &'static str {
        match (self, policy) {
            (DistributionCase::NoImages, _) => "no images, every post gets a numbered tile",
            (DistributionCase::SingleImage, _) => {
                "one image, first post original, the rest numbered overlays"
            }
            (DistributionCase::SufficientImages, MidSequence::Overlay) => {
                "enough images, first post original, the rest numbered overlays on their own image"
            }
            (DistributionCase::SufficientImages, MidSequence::Verbatim) => {
                "enough images, every post original"
            }
            (DistributionCase::MorePostsThanImages, MidSequence::Overlay) => {
                "more posts than images, extra posts get overlays on the first image"
            }
            (DistributionCase::MorePostsThanImages, MidSequence::Verbatim) => {
                "more posts than images, originals first, then overlays on the first image"
            }
        }
    }
}

impl fmt::Display for DistributionCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DistributionCase::NoImages => "no images",
            DistributionCase::SingleImage => "single image",
            DistributionCase::SufficientImages => "sufficient images",
            DistributionCase::MorePostsThanImages => "more posts than images",
        };
        f.write_str(label)
    }
}

/// Assigns images to posts, rendering through a shared generator.
pub struct ImageDistributor<'g, L, R> {
    generator: &'g NumberedImageGenerator<L, R>,
    policy: MidSequence,
}

impl<'g, L: ImageLoader, R: Renderer> ImageDistributor<'g, L, R> {
    pub fn new(generator: &'g NumberedImageGenerator<L, R>, policy: MidSequence) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> MidSequence {
        self.policy
    }

    /// Produce exactly `post_count` slots for `images`.
    pub fn distribute(&self, images: &[String], post_count: usize) -> Distribution {
        let case = DistributionCase::classify(images.len(), post_count);
        info!(
            images = images.len(),
            posts = post_count,
            case = %case,
            "distributing images: {}",
            case.description(self.policy)
        );

        let slots: Vec<SlotImage> = (0..post_count)
            .into_par_iter()
            .map(|i| self.slot_for(i, images))
            .collect();

        Distribution { slots }
    }

    /// Resolve a single post, absorbing every failure.
    pub fn slot_for(&self, post_index: usize, images: &[String]) -> SlotImage {
        let treatment = treatment_for(post_index, images, self.policy);
        debug!(post = post_index + 1, ?treatment, "treatment decided");

        let base = match treatment {
            Treatment::Verbatim(reference) => return SlotImage::Source(reference.to_string()),
            Treatment::Overlay(reference) => Some(reference),
            Treatment::FlatTile => None,
        };

        match self.generator.generate(post_index, base) {
            Ok(image) => SlotImage::Rendered(image),
            Err(err) if base.is_some() => {
                error!(post = post_index + 1, error = %err, "overlay failed, trying flat tile");
                self.flat_tile_or_empty(post_index)
            }
            Err(err) => {
                error!(post = post_index + 1, error = %err, "no image for post");
                SlotImage::Empty
            }
        }
    }

    fn flat_tile_or_empty(&self, post_index: usize) -> SlotImage {
        match self.generator.generate(post_index, None) {
            Ok(image) => SlotImage::Rendered(image),
            Err(err) => {
                error!(post = post_index + 1, error = %err, "no image for post");
                SlotImage::Empty
            }
        }
    }
}
