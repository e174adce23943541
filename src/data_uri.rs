//! `data:` URI encoding and parsing.
//!
//! Rendered post images travel as self-contained data URIs, and source
//! images may arrive as data URIs from the content extractor.
//!
//! ```text
//! data:[<mime>][;base64],<payload>
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI has no ',' separator")]
    MissingPayload,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Media type, `text/plain;charset=US-ASCII` when the URI omits it.
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Encode bytes as a base64 data URI.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Whether a reference is a data URI (scheme match is case-insensitive).
pub fn is_data_uri(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

const BASE64_MARKER: &str = ";base64";

/// Header without its trailing `;base64`, matched case-insensitively.
fn strip_base64_marker(header: &str) -> Option<&str> {
    let split = header.len().checked_sub(BASE64_MARKER.len())?;
    let marker = header.get(split..)?;
    marker
        .eq_ignore_ascii_case(BASE64_MARKER)
        .then(|| &header[..split])
}

/// Parse a data URI.
///
/// Base64 payloads tolerate embedded whitespace. Non-base64 payloads are
/// taken as raw bytes (no percent-decoding).
pub fn parse(uri: &str) -> Result<DataUri, DataUriError> {
    if !is_data_uri(uri) {
        return Err(DataUriError::MissingScheme);
    }
    let (header, payload) = uri[5..]
        .split_once(',')
        .ok_or(DataUriError::MissingPayload)?;

    let (mime, is_base64) = match strip_base64_marker(header) {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = if mime.is_empty() {
        "text/plain;charset=US-ASCII".to_string()
    } else {
        mime.to_ascii_lowercase()
    };

    let bytes = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact)?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(DataUri { mime, bytes })
}
