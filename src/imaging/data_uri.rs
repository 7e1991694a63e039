//! `data:` URI encoding and parsing.
//!
//! Only the base64 form is produced. Parsing accepts any `image/*` media
//! type with the `;base64` marker; parameters before it (e.g. `;charset=`)
//! are ignored.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI has no ',' separator")]
    MissingPayload,
    #[error("data URI is not base64-encoded")]
    NotBase64,
    #[error("data URI media type '{0}' is not an image")]
    NotAnImage(String),
    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// A parsed `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Format bytes as `data:<mime>;base64,<payload>`.
pub fn format_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Parse an image `data:` URI.
pub fn parse_data_uri(uri: &str) -> Result<DataUri, DataUriError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUriError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingPayload)?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DataUriError::NotBase64);
    }
    if !mime.starts_with("image/") {
        return Err(DataUriError::NotAnImage(mime));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUriError::Payload(e.to_string()))?;
    Ok(DataUri { mime, bytes })
}
