//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; the binary installs a
//! subscriber once at startup. Events go to stderr so stdout stays clean for
//! command output.

use crate::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    Level(String),
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Parse a configured level name.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::Level(level.to_string()))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(logging: &LoggingConfig) -> Result<(), LoggingError> {
    let level = parse_level(&logging.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}
