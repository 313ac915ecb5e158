//! Image metadata carried as user attributes on stored objects.

use std::collections::HashMap;

use tracing::warn;

/// Attribute key for the image width.
pub const WIDTH: &str = "width";
/// Attribute key for the image height.
pub const HEIGHT: &str = "height";
/// Attribute key for the mime type.
pub const MIME_TYPE: &str = "mimeType";

/// Decoded sidecar attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    /// Width in pixels, 0 when unknown.
    pub width: u32,
    /// Height in pixels, 0 when unknown.
    pub height: u32,
    /// Mime type, empty when unknown.
    pub mime_type: String,
}

/// A sidecar attribute that is present but unreadable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("attribute '{field}' is not a valid dimension: {value:?}")]
pub struct DecodeError {
    /// Attribute key.
    pub field: &'static str,
    /// Raw attribute value.
    pub value: String,
}

/// Encode image dimensions and mime type as object attributes.
#[must_use]
pub fn encode(width: u32, height: u32, mime_type: &str) -> HashMap<String, String> {
    HashMap::from([
        (WIDTH.to_string(), width.to_string()),
        (HEIGHT.to_string(), height.to_string()),
        (MIME_TYPE.to_string(), mime_type.to_string()),
    ])
}

/// Encode only the mime type, for uploads that are not images.
#[must_use]
pub fn encode_mime_only(mime_type: &str) -> HashMap<String, String> {
    HashMap::from([(MIME_TYPE.to_string(), mime_type.to_string())])
}

/// Decode attributes written by [`encode`].
///
/// Missing keys default to `0`, `0` and `""`. Keys match case-insensitively
/// because OSS and S3 return user metadata names lowercased.
///
/// # Errors
///
/// Returns `DecodeError` if a dimension is present but not a decimal `u32`.
pub fn decode(attributes: &HashMap<String, String>) -> Result<Sidecar, DecodeError> {
    Ok(Sidecar {
        width: dimension(attributes, WIDTH)?,
        height: dimension(attributes, HEIGHT)?,
        mime_type: lookup(attributes, MIME_TYPE).cloned().unwrap_or_default(),
    })
}

/// Decode attributes, treating malformed dimensions as unknown.
#[must_use]
pub fn decode_lenient(attributes: &HashMap<String, String>) -> Sidecar {
    let lenient = |field| {
        dimension(attributes, field).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed image dimension");
            0
        })
    };
    Sidecar {
        width: lenient(WIDTH),
        height: lenient(HEIGHT),
        mime_type: lookup(attributes, MIME_TYPE).cloned().unwrap_or_default(),
    }
}

fn lookup<'a>(attributes: &'a HashMap<String, String>, field: &str) -> Option<&'a String> {
    attributes.get(field).or_else(|| {
        attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    })
}

fn dimension(attributes: &HashMap<String, String>, field: &'static str) -> Result<u32, DecodeError> {
    match lookup(attributes, field) {
        None => Ok(0),
        Some(raw) => raw.trim().parse().map_err(|_| DecodeError {
            field,
            value: raw.clone(),
        }),
    }
}
