//! Upload image pipeline.
//!
//! Raster uploads are decoded, turned upright according to their EXIF
//! orientation, measured and re-encoded before they reach the bucket.
//! Re-encoding drops the EXIF block, so stored images carry no orientation
//! tag.

pub mod mime;
pub mod orientation;
pub mod pipeline;

pub use mime::{DEFAULT_MIME_TYPE, UploadKind, mime_type};
pub use orientation::{ORIENTATION_TAG, Rotation, Transform, read_orientation};
pub use pipeline::{ProcessedUpload, process_upload};
