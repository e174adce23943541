//! Rendering configuration.
//!
//! Handles loading, validating, and merging `threadcards.toml`. A user file
//! is sparse: its values are deep-merged over the stock defaults, so it only
//! needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [canvas]
//! width = 1200              # Primary post image size (Twitter 16:9 card)
//! height = 675
//! format = "jpeg"           # "jpeg" or "png"
//! quality = 80              # JPEG quality (1-100)
//!
//! [fallback]
//! width = 600               # Last-resort flat tile size
//! height = 400
//! quality = 92
//! numeral_ratio = 0.2       # Numeral size as a fraction of the height
//!
//! [numeral]
//! size_ratio = 0.18         # Numeral size as a fraction of canvas height
//! color = "#FFFFFF"
//!
//! [numeral.shadow]
//! color = "#000000"
//! opacity = 0.8
//! blur = 10.0               # Pixels, at most 100
//! offset_x = 2
//! offset_y = 2
//!
//! [overlay]
//! color = "#000000"         # Layer over base images, under the numeral
//! opacity = 0.6
//!
//! [palette]
//! colors = ["#29AB87", "#2563EB", ...]   # Flat tile backgrounds by post index
//!
//! [loading]
//! timeout_secs = 10         # Per-image fetch timeout
//! max_bytes = 20971520      # Largest accepted source image
//! allow_files = true        # Treat non-URL references as local paths
//!
//! [distribution]
//! mid_sequence = "overlay"  # "overlay" or "verbatim" for posts 2..N with their own image
//!
//! [logging]
//! level = "info"            # RUST_LOG overrides
//! format = "compact"        # "compact" or "json"
//!
//! [processing]
//! max_processes = 4         # Max parallel renders (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::distribute::MidSequence;
use crate::imaging::{Color, OutputFormat};
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest accepted `numeral.shadow.blur`, in pixels.
pub const MAX_SHADOW_BLUR: f32 = 100.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `threadcards.toml`.
///
/// All fields have defaults matching the reference rendering. Unknown keys
/// are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Primary canvas size and encoding.
    pub canvas: CanvasConfig,
    /// Last-resort fallback tile.
    pub fallback: FallbackConfig,
    /// Numeral size, color and shadow.
    pub numeral: NumeralConfig,
    /// Dark layer over base images.
    pub overlay: OverlayConfig,
    /// Flat tile background colors.
    pub palette: PaletteConfig,
    /// Source image fetching.
    pub loading: LoadingConfig,
    /// Distribution policy.
    pub distribution: DistributionConfig,
    /// Log level and format.
    pub logging: LoggingConfig,
    /// Parallel rendering settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Validation(
                "canvas.width and canvas.height must be non-zero".into(),
            ));
        }
        if self.fallback.width == 0 || self.fallback.height == 0 {
            return Err(ConfigError::Validation(
                "fallback.width and fallback.height must be non-zero".into(),
            ));
        }
        for (key, quality) in [
            ("canvas.quality", self.canvas.quality),
            ("fallback.quality", self.fallback.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        for (key, ratio) in [
            ("numeral.size_ratio", self.numeral.size_ratio),
            ("fallback.numeral_ratio", self.fallback.numeral_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::Validation(format!("{key} must be in (0, 1]")));
            }
        }
        for (key, opacity) in [
            ("overlay.opacity", self.overlay.opacity),
            ("numeral.shadow.opacity", self.numeral.shadow.opacity),
        ] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ConfigError::Validation(format!("{key} must be 0.0-1.0")));
            }
        }
        if !(0.0..=MAX_SHADOW_BLUR).contains(&self.numeral.shadow.blur) {
            return Err(ConfigError::Validation(format!(
                "numeral.shadow.blur must be between 0 and {MAX_SHADOW_BLUR}"
            )));
        }
        if self.palette.colors.is_empty() {
            return Err(ConfigError::Validation(
                "palette.colors must not be empty".into(),
            ));
        }
        for (key, hex) in [
            ("numeral.color", &self.numeral.color),
            ("numeral.shadow.color", &self.numeral.shadow.color),
            ("overlay.color", &self.overlay.color),
        ]
        .into_iter()
        .chain(self.palette.colors.iter().map(|c| ("palette.colors", c)))
        {
            parse_color(key, hex)?;
        }
        if self.loading.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "loading.timeout_secs must be non-zero".into(),
            ));
        }
        if self.loading.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "loading.max_bytes must be non-zero".into(),
            ));
        }
        if crate::logging::parse_level(&self.logging.level).is_err() {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not a log level",
                self.logging.level
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a `#RRGGBB` config value, naming the key on failure.
pub fn parse_color(key: &str, hex: &str) -> Result<Color, ConfigError> {
    Color::from_hex(hex).ok_or_else(|| {
        ConfigError::Validation(format!("{key}: '{hex}' is not a #RRGGBB color"))
    })
}

/// Primary canvas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Lossy encoding quality (1-100). Ignored for PNG.
    pub quality: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 675,
            format: OutputFormat::Jpeg,
            quality: 80,
        }
    }
}

/// Last-resort fallback tile settings.
///
/// The fallback is a flat tile without shadow, drawn when the primary
/// render fails for any reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    /// Numeral size as a fraction of the fallback height.
    pub numeral_ratio: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 400,
            quality: 92,
            numeral_ratio: 0.2,
        }
    }
}

/// Numeral settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumeralConfig {
    /// Numeral size as a fraction of the canvas height.
    pub size_ratio: f32,
    /// Fill color (`#RRGGBB`).
    pub color: String,
    /// Drop shadow under the numeral.
    pub shadow: ShadowConfig,
}

impl Default for NumeralConfig {
    fn default() -> Self {
        Self {
            size_ratio: 0.18,
            color: "#FFFFFF".to_string(),
            shadow: ShadowConfig::default(),
        }
    }
}

/// Drop shadow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowConfig {
    pub color: String,
    pub opacity: f32,
    /// Blur radius in pixels.
    pub blur: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            opacity: 0.8,
            blur: 10.0,
            offset_x: 2,
            offset_y: 2,
        }
    }
}

/// Overlay drawn over base images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    pub color: String,
    pub opacity: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            opacity: 0.6,
        }
    }
}

/// Flat tile background colors, picked by `post_index % colors.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteConfig {
    pub colors: Vec<String>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: [
                "#29AB87", "#2563EB", "#7C3AED", "#DC2626", "#D97706", "#059669", "#DB2777",
                "#0891B2", "#F59E0B", "#10B981",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

/// Source image fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadingConfig {
    /// Per-image timeout for remote fetches.
    pub timeout_secs: u64,
    /// Largest accepted source image, in bytes.
    pub max_bytes: u64,
    /// Treat references that are neither URLs nor data URIs as local paths.
    pub allow_files: bool,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_bytes: 20 * 1024 * 1024,
            allow_files: true,
        }
    }
}

/// Distribution policy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistributionConfig {
    /// Treatment for posts after the first that have their own source image.
    pub mid_sequence: MidSequence,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel renders.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely (so a
///   `palette.colors` list is replaced, never appended to).
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Err` if the file is missing or contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an optional file path.
///
/// Without a path the stock defaults are returned.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(overlay)
}

/// Returns a fully-commented stock `threadcards.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# threadcards configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Primary post image
# ---------------------------------------------------------------------------
[canvas]
# Output size. 1200x675 is the 16:9 large-card size.
width = 1200
height = 675

# "jpeg" or "png".
format = "jpeg"

# JPEG quality (1 = worst, 100 = best). Ignored for PNG.
quality = 80

# ---------------------------------------------------------------------------
# Last-resort fallback tile (used when the primary render fails)
# ---------------------------------------------------------------------------
[fallback]
width = 600
height = 400
quality = 92

# Numeral size as a fraction of the fallback height.
numeral_ratio = 0.2

# ---------------------------------------------------------------------------
# Post numeral (always post position + 1)
# ---------------------------------------------------------------------------
[numeral]
# Numeral size as a fraction of the canvas height.
size_ratio = 0.18
color = "#FFFFFF"

# Drop shadow keeping the numeral legible on any background.
[numeral.shadow]
color = "#000000"
opacity = 0.8
blur = 10.0
offset_x = 2
offset_y = 2

# ---------------------------------------------------------------------------
# Dark layer drawn over base images, beneath the numeral
# ---------------------------------------------------------------------------
[overlay]
color = "#000000"
opacity = 0.6

# ---------------------------------------------------------------------------
# Flat tile backgrounds. Post N uses colors[(N - 1) % len].
# ---------------------------------------------------------------------------
[palette]
colors = [
    "#29AB87",
    "#2563EB",
    "#7C3AED",
    "#DC2626",
    "#D97706",
    "#059669",
    "#DB2777",
    "#0891B2",
    "#F59E0B",
    "#10B981",
]

# ---------------------------------------------------------------------------
# Source image loading
# ---------------------------------------------------------------------------
[loading]
# Per-image timeout for remote fetches. A timeout counts as "unavailable"
# and the post falls back to a flat tile.
timeout_secs = 10

# Largest accepted source image in bytes (20 MiB).
max_bytes = 20971520

# Treat references that are neither URLs nor data URIs as local file paths.
allow_files = true

# ---------------------------------------------------------------------------
# Distribution
# ---------------------------------------------------------------------------
[distribution]
# Posts after the first that have their own source image:
#   "overlay"  - numbered overlay on that image
#   "verbatim" - the image as is
# The first post always gets the first image unmodified.
mid_sequence = "overlay"

# ---------------------------------------------------------------------------
# Logging (RUST_LOG overrides the level)
# ---------------------------------------------------------------------------
[logging]
level = "info"

# "compact" or "json".
format = "compact"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel renders.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
