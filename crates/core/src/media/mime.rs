//! Mime types and upload classification by file extension.

use image::ImageFormat;

use crate::storage::key;

/// Mime type used when the extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// How an upload is processed, decided by extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Raster image that is decoded and re-encoded.
    Raster(ImageFormat),
    /// Windows icon; bytes are kept, dimensions read from the header.
    Icon,
    /// Anything else, stored verbatim.
    Other,
}

impl UploadKind {
    /// Classify `path` by its extension, ignoring case.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        match key::extension(path).to_ascii_lowercase().as_str() {
            ".jpg" | ".jpeg" => Self::Raster(ImageFormat::Jpeg),
            ".png" => Self::Raster(ImageFormat::Png),
            ".gif" => Self::Raster(ImageFormat::Gif),
            ".bmp" => Self::Raster(ImageFormat::Bmp),
            ".ico" => Self::Icon,
            _ => Self::Other,
        }
    }
}

/// Mime type for `path` derived from its extension.
#[must_use]
pub fn mime_type(path: &str) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}
