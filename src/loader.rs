//! Source image loading.
//!
//! The generator asks an [`ImageLoader`] for pixels and gets back either a
//! decoded image or a [`LoadError`]. Every failure (network error, timeout,
//! non-success status, corrupt or zero-sized image) means the same thing to
//! the caller: the base image is unavailable.
//!
//! [`DefaultLoader`] resolves references by shape:
//!
//! | Reference | Transport |
//! |---|---|
//! | `data:image/png;base64,...` | decoded in place ([`data_uri`](crate::data_uri)) |
//! | `https://host/a.jpg`, `http://...` | blocking HTTP GET with timeout |
//! | `//host/a.jpg` | fetched over `https:` |
//! | anything else | local file path (when enabled) |
//!
//! HTTP requests are anonymous: no cookies, no credentials.

use crate::config::LoadingConfig;
use crate::data_uri::{self, DataUriError};
use image::DynamicImage;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },
    #[error("Image exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Invalid data URI: {0}")]
    DataUri(#[from] DataUriError),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image has zero dimensions")]
    ZeroDimensions,
    #[error("Unsupported image reference: {0}")]
    Unsupported(String),
}

/// Port for turning an image reference into pixels.
pub trait ImageLoader: Send + Sync {
    fn load(&self, reference: &str) -> Result<DynamicImage, LoadError>;
}

/// How a reference string will be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<'a> {
    Data(&'a str),
    Remote(String),
    File(&'a Path),
}

impl<'a> Reference<'a> {
    pub fn classify(reference: &'a str) -> Self {
        let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
        if data_uri::is_data_uri(reference) {
            Reference::Data(reference)
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            Reference::Remote(reference.to_string())
        } else if let Some(rest) = reference.strip_prefix("//") {
            Reference::Remote(format!("https://{rest}"))
        } else {
            Reference::File(Path::new(reference))
        }
    }
}

/// Loader for data URIs, HTTP(S) URLs and local files.
pub struct DefaultLoader {
    client: reqwest::blocking::Client,
    max_bytes: u64,
    allow_files: bool,
}

impl DefaultLoader {
    pub fn new(config: &LoadingConfig) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("threadcards/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
            allow_files: config.allow_files,
        })
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(LoadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        // Content-Length may be absent or wrong; cap the read itself
        let mut bytes = Vec::new();
        response.take(self.max_bytes + 1).read_to_end(&mut bytes)?;
        self.check_size(bytes)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
        if !self.allow_files {
            return Err(LoadError::Unsupported(format!(
                "local files are disabled: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)?;
        self.check_size(bytes)
    }

    fn check_size(&self, bytes: Vec<u8>) -> Result<Vec<u8>, LoadError> {
        if bytes.len() as u64 > self.max_bytes {
            return Err(LoadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(bytes)
    }
}

impl ImageLoader for DefaultLoader {
    fn load(&self, reference: &str) -> Result<DynamicImage, LoadError> {
        let bytes = match Reference::classify(reference) {
            Reference::Data(uri) => self.check_size(data_uri::parse(uri)?.bytes)?,
            Reference::Remote(url) => self.fetch(&url)?,
            Reference::File(path) => self.read_file(path)?,
        };
        decode(&bytes)
    }
}

/// Decode image bytes, rejecting images without pixels.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, LoadError> {
    let image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(LoadError::ZeroDimensions);
    }
    Ok(image)
}
