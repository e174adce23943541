//! # Threadcards
//!
//! Per-post images for social media threads. Given the images found in an
//! article and the number of posts the article was split into, decide what
//! each post shows and render the numbered cards that are missing.
//!
//! # Architecture: Decide, Then Render
//!
//! ```text
//! 1. Treatment   (images, post_count)  →  per-post decision   (pure)
//! 2. Render      decision              →  RenderedImage        (per post, parallel)
//! 3. Collect     slots                 →  Distribution         (ordered by post)
//! ```
//!
//! The decision step is a pure function of the post index and the image list,
//! so every rule is unit testable without touching pixels. Rendering goes
//! through two ports, [`loader::ImageLoader`] and [`imaging::Renderer`], both
//! with recording mocks for tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`distribute`] | Per-post treatment rules, failure isolation, coverage statistics |
//! | [`imaging`] | Numbered card rendering: cover-fit, overlay, numerals, shadow, encoding |
//! | [`loader`] | Source image loading from data URIs, HTTP(S) and local files |
//! | [`references`] | Image URL validation, normalization, chrome filtering, relevance ranking |
//! | [`data_uri`] | `data:` URI encoding and parsing |
//! | [`config`] | `threadcards.toml` loading, validation and merging over stock defaults |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Lead Post Stays Clean
//!
//! The first post always shows the article's first image untouched. It is
//! the hero of the thread and the image link previews pick up. Numbered
//! cards only ever appear from the second post on.
//!
//! ## Failures Stay Inside Their Post
//!
//! Nothing that goes wrong for one post reaches another. A base image that
//! cannot be loaded degrades to a flat numbered tile; a primary render that
//! fails degrades to a small fallback tile; only when no surface at all can
//! be produced does the post get an empty slot. A distribution always has
//! exactly one slot per post.
//!
//! ## Embedded Numeral Font
//!
//! Numerals are set in DejaVu Sans Bold, compiled into the binary and
//! rasterized with `ab_glyph`. There are no system fonts to discover, and the
//! output is identical on every machine.
//!
//! ## Configurable Mid-Sequence Policy
//!
//! Posts after the first that have their own source image get a numbered
//! overlay on it by default, keeping the numbering visible through the whole
//! thread. `distribution.mid_sequence = "verbatim"` reuses those images
//! unmodified instead.

pub mod config;
pub mod data_uri;
pub mod distribute;
pub mod imaging;
pub mod loader;
pub mod logging;
pub mod output;
pub mod references;
