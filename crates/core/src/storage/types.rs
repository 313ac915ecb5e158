//! Storage file and folder value objects.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use super::cache::ClientFactory;
use super::client::{ObjectHead, ObjectSummary};
use super::error::{StorageError, StorageResult};
use super::key;
use super::provider::StorageProvider;
use super::settings::SettingsSource;
use super::sidecar;

/// Snapshot of a stored file.
///
/// Built either from a metadata fetch (every field populated) or from a
/// listing summary (dimensions and mime type unknown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFile {
    path: String,
    size: u64,
    last_modified: DateTime<Utc>,
    mime_type: String,
    width: u32,
    height: u32,
}

impl StorageFile {
    /// Build from a metadata fetch of `path`.
    ///
    /// Malformed dimensions are treated as unknown. The mime type comes from
    /// the sidecar, falling back to the object's content type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Decode` if the store did not report the size
    /// or last-modified time.
    pub fn from_head(path: impl Into<String>, head: ObjectHead) -> StorageResult<Self> {
        let path = path.into();
        let size = head
            .content_length
            .ok_or_else(|| StorageError::decode(&path, "missing content length"))?;
        let last_modified = head
            .last_modified
            .ok_or_else(|| StorageError::decode(&path, "missing last-modified time"))?;

        let sidecar = sidecar::decode_lenient(&head.user_metadata);
        let mime_type = if sidecar.mime_type.is_empty() {
            head.content_type.unwrap_or_default()
        } else {
            sidecar.mime_type
        };

        Ok(Self {
            path,
            size,
            last_modified,
            mime_type,
            width: sidecar.width,
            height: sidecar.height,
        })
    }

    /// Build from a listing summary.
    #[must_use]
    pub fn from_summary(summary: &ObjectSummary) -> Self {
        Self {
            path: key::to_path(&summary.key),
            size: summary.size,
            last_modified: summary.last_modified,
            mime_type: String::new(),
            width: 0,
            height: 0,
        }
    }

    /// Virtual path, starting with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        key::file_name(&self.path)
    }

    /// Extension including the dot, empty when none.
    #[must_use]
    pub fn file_type(&self) -> &str {
        key::extension(&self.path)
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last modification time.
    #[must_use]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Mime type, empty when unknown.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Width in pixels, 0 when unknown.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, 0 when unknown.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Snapshot of a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFolder {
    name: String,
    path: String,
    last_modified: DateTime<Utc>,
    parent: Option<Box<StorageFolder>>,
}

impl StorageFolder {
    /// Create a folder.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        last_modified: DateTime<Utc>,
        parent: Option<StorageFolder>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            last_modified,
            parent: parent.map(Box::new),
        }
    }

    /// Build from a listing common prefix such as `photos/2024/`.
    ///
    /// Stores do not report folder timestamps, so the time is "now".
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Self {
        let name = key::file_name(prefix.trim_end_matches(key::SEPARATOR));
        Self::new(name, key::to_path(prefix), Utc::now(), None)
    }

    /// Folder name, the last segment of its path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Virtual path, starting and ending with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last modification time.
    #[must_use]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Folders always report a size of 0.
    #[must_use]
    pub fn size(&self) -> u64 {
        0
    }

    /// Parent folder, when the caller supplied one.
    #[must_use]
    pub fn parent(&self) -> Option<&StorageFolder> {
        self.parent.as_deref()
    }
}

/// Write handle returned by `StorageProvider::create_file`.
///
/// Bytes are buffered in memory. Nothing reaches the store until
/// [`FileWriter::finish`]; dropping the writer discards the buffer.
pub struct FileWriter<'a, S: SettingsSource, F: ClientFactory> {
    provider: &'a StorageProvider<S, F>,
    path: String,
    buffer: BytesMut,
}

impl<'a, S: SettingsSource, F: ClientFactory> FileWriter<'a, S, F> {
    pub(crate) fn new(provider: &'a StorageProvider<S, F>, path: String) -> Self {
        Self {
            provider,
            path,
            buffer: BytesMut::new(),
        }
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of bytes buffered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append bytes to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.put_slice(data);
    }

    /// Persist the buffered content through the upload pipeline.
    ///
    /// # Errors
    ///
    /// Same as `StorageProvider::save_stream`.
    pub async fn finish(self) -> StorageResult<StorageFile> {
        let content: Bytes = self.buffer.freeze();
        self.provider.save_stream(&self.path, content).await?;
        self.provider.get_file(&self.path).await
    }
}

impl<S: SettingsSource, F: ClientFactory> io::Write for FileWriter<'_, S, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn head() -> ObjectHead {
        ObjectHead {
            content_type: Some("image/jpeg".to_string()),
            content_length: Some(2048),
            last_modified: Some(Utc::now()),
            user_metadata: HashMap::from([
                ("width".to_string(), "640".to_string()),
                ("height".to_string(), "480".to_string()),
                ("mimeType".to_string(), "image/jpeg".to_string()),
            ]),
        }
    }

    #[test]
    fn test_from_head_populates_all_fields() {
        let file = StorageFile::from_head("/pics/photo.jpg", head()).unwrap();
        assert_eq!(file.path(), "/pics/photo.jpg");
        assert_eq!(file.name(), "photo.jpg");
        assert_eq!(file.file_type(), ".jpg");
        assert_eq!(file.size(), 2048);
        assert_eq!(file.width(), 640);
        assert_eq!(file.height(), 480);
        assert_eq!(file.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_from_head_missing_core_field_fails() {
        let mut incomplete = head();
        incomplete.content_length = None;
        assert!(matches!(
            StorageFile::from_head("/a.jpg", incomplete),
            Err(StorageError::Decode { .. })
        ));

        let mut incomplete = head();
        incomplete.last_modified = None;
        assert!(StorageFile::from_head("/a.jpg", incomplete).is_err());
    }

    #[test]
    fn test_from_head_malformed_dimension_is_unknown() {
        let mut malformed = head();
        malformed
            .user_metadata
            .insert("width".to_string(), "n/a".to_string());
        let file = StorageFile::from_head("/a.jpg", malformed).unwrap();
        assert_eq!(file.width(), 0);
        assert_eq!(file.height(), 480);
    }

    #[test]
    fn test_from_head_falls_back_to_content_type() {
        let mut bare = head();
        bare.user_metadata.clear();
        let file = StorageFile::from_head("/a.jpg", bare).unwrap();
        assert_eq!(file.mime_type(), "image/jpeg");
        assert_eq!(file.width(), 0);
    }

    #[test]
    fn test_from_summary() {
        let summary = ObjectSummary {
            key: "docs/readme".to_string(),
            size: 12,
            last_modified: Utc::now(),
        };
        let file = StorageFile::from_summary(&summary);
        assert_eq!(file.path(), "/docs/readme");
        assert_eq!(file.file_type(), "");
        assert_eq!(file.mime_type(), "");
        assert_eq!(file.width(), 0);
    }

    #[test]
    fn test_folder_from_prefix() {
        let folder = StorageFolder::from_prefix("photos/2024/");
        assert_eq!(folder.name(), "2024");
        assert_eq!(folder.path(), "/photos/2024/");
        assert_eq!(folder.size(), 0);
        assert!(folder.parent().is_none());
    }

    #[test]
    fn test_folder_with_parent() {
        let parent = StorageFolder::from_prefix("photos/");
        let child = StorageFolder::new("2024", "/photos/2024/", Utc::now(), Some(parent.clone()));
        assert_eq!(child.parent(), Some(&parent));
    }
}
