//! Turning raw upload bytes into what gets stored.

use std::io::Cursor;

use bytes::Bytes;
use image::{GenericImageView, ImageFormat};
use tracing::debug;

use super::mime::{UploadKind, mime_type};
use super::orientation::{Transform, read_orientation};
use crate::storage::error::{StorageError, StorageResult};

/// Offset of the first icon's width and height in an ICO file.
const ICO_DIMENSIONS_OFFSET: usize = 6;

/// Upload ready to be written to the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedUpload {
    /// Bytes to store.
    pub body: Bytes,
    /// Mime type derived from the extension.
    pub mime_type: String,
    /// Width and height for images, `None` for other content.
    pub dimensions: Option<(u32, u32)>,
}

/// Prepare `content` for storage at `path`.
///
/// Raster images are made upright, measured and re-encoded in their
/// original format. Icons keep their bytes and report the dimensions of
/// their first image. Everything else passes through unchanged.
///
/// # Errors
///
/// Returns `StorageError::ImageProcessing` when an image cannot be decoded
/// or re-encoded, or an icon header is truncated.
pub fn process_upload(path: &str, content: Bytes) -> StorageResult<ProcessedUpload> {
    let mime_type = mime_type(path);

    let (body, dimensions) = match UploadKind::from_path(path) {
        UploadKind::Raster(format) => {
            let (body, width, height) = normalize_image(path, &content, format)?;
            (body, Some((width, height)))
        }
        UploadKind::Icon => {
            let dimensions = icon_dimensions(&content)
                .ok_or_else(|| StorageError::image(format!("{path}: truncated icon header")))?;
            (content, Some(dimensions))
        }
        UploadKind::Other => (content, None),
    };

    Ok(ProcessedUpload {
        body,
        mime_type,
        dimensions,
    })
}

fn normalize_image(path: &str, content: &[u8], format: ImageFormat) -> StorageResult<(Bytes, u32, u32)> {
    let mut image = image::load_from_memory_with_format(content, format)
        .map_err(|e| StorageError::image(format!("{path}: {e}")))?;

    if let Some(orientation) = read_orientation(content) {
        if let Some(transform) = Transform::for_orientation(orientation) {
            debug!(path, orientation, "Applying EXIF orientation");
            image = transform.apply(image);
        }
    }

    let (width, height) = image.dimensions();

    let mut encoded = Cursor::new(Vec::with_capacity(content.len()));
    image
        .write_to(&mut encoded, format)
        .map_err(|e| StorageError::image(format!("{path}: {e}")))?;

    Ok((Bytes::from(encoded.into_inner()), width, height))
}

/// Width and height of the first image in an ICO file; 0 means 256.
fn icon_dimensions(content: &[u8]) -> Option<(u32, u32)> {
    let size = |byte: u8| if byte == 0 { 256 } else { u32::from(byte) };
    let width = *content.get(ICO_DIMENSIONS_OFFSET)?;
    let height = *content.get(ICO_DIMENSIONS_OFFSET + 1)?;
    Some((size(width), size(height)))
}
