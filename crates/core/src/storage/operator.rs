//! Object-store client backed by Apache OpenDAL.
//!
//! Supports Aliyun OSS and S3-compatible services. Timeouts and retries are
//! left to OpenDAL layers; the provider itself never retries.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use cirrus_shared::{BackendKind, StorageSettings};
use futures::TryStreamExt;
use opendal::layers::{LoggingLayer, RetryLayer, TimeoutLayer};
use opendal::{Builder, ErrorKind, Operator, services};

use super::cache::ClientFactory;
use super::client::{
    ListPage, ListRequest, MAX_KEYS, ObjectAttributes, ObjectClient, ObjectHead, ObjectSummary,
};
use super::error::{StorageError, StorageResult};

/// Connection timeout for every store request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Retries performed by the client library on temporary failures.
const MAX_RETRIES: usize = 3;

/// Object-store client wrapping an OpenDAL operator.
#[derive(Debug, Clone)]
pub struct OpendalClient {
    operator: Operator,
}

impl OpendalClient {
    /// Wrap an existing operator.
    #[must_use]
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Build a client from site settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if the settings are incomplete,
    /// name the memory backend, or are rejected by OpenDAL.
    pub fn from_settings(settings: &StorageSettings) -> StorageResult<Self> {
        settings.validate()?;

        let operator = match settings.backend {
            BackendKind::Oss => {
                let builder = services::Oss::default()
                    .endpoint(&settings.endpoint)
                    .bucket(&settings.bucket)
                    .access_key_id(&settings.access_key_id)
                    .access_key_secret(&settings.access_key_secret);
                finish(builder)?
            }
            BackendKind::S3 => {
                let builder = services::S3::default()
                    .endpoint(&settings.endpoint)
                    .bucket(&settings.bucket)
                    .region(settings.region.as_deref().unwrap_or_default())
                    .access_key_id(&settings.access_key_id)
                    .secret_access_key(&settings.access_key_secret);
                finish(builder)?
            }
            BackendKind::Memory => {
                return Err(StorageError::configuration(
                    "memory backend is served by the in-memory client",
                ));
            }
        };

        Ok(Self::new(operator))
    }
}

/// Create OpenDAL operator with logging, timeout and retry layers.
fn finish<B: Builder>(builder: B) -> StorageResult<Operator> {
    let operator = Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .layer(LoggingLayer::default())
        .layer(
            TimeoutLayer::new()
                .with_timeout(REQUEST_TIMEOUT)
                .with_io_timeout(REQUEST_TIMEOUT),
        )
        .layer(RetryLayer::new().with_max_times(MAX_RETRIES))
        .finish();
    Ok(operator)
}

fn is_folder_marker(key: &str) -> bool {
    key.ends_with('/')
}

/// Map an OpenDAL error, naming `key` when it is missing.
fn classify(key: &str, err: opendal::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::not_found(key)
    } else {
        err.into()
    }
}

impl ObjectClient for OpendalClient {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        attributes: ObjectAttributes,
    ) -> StorageResult<()> {
        // OpenDAL refuses writes to directory paths; markers go through create_dir.
        if is_folder_marker(key) {
            return self.operator.create_dir(key).await.map_err(|e| classify(key, e));
        }

        let mut write = self.operator.write_with(key, body);
        if !attributes.content_type.is_empty() {
            write = write.content_type(&attributes.content_type);
        }
        if !attributes.user_metadata.is_empty() {
            write = write.user_metadata(attributes.user_metadata);
        }
        write.await.map_err(|e| classify(key, e))?;
        Ok(())
    }

    async fn head_object(&self, key: &str) -> StorageResult<ObjectHead> {
        let metadata = self.operator.stat(key).await.map_err(|e| classify(key, e))?;
        Ok(ObjectHead {
            content_type: metadata.content_type().map(str::to_string),
            content_length: Some(metadata.content_length()),
            last_modified: metadata.last_modified(),
            user_metadata: metadata.user_metadata().cloned().unwrap_or_default(),
        })
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let buffer = self.operator.read(key).await.map_err(|e| classify(key, e))?;
        Ok(buffer.to_bytes())
    }

    async fn list_objects(&self, request: &ListRequest) -> StorageResult<ListPage> {
        // OpenDAL addresses the bucket root as "/".
        let path = if request.prefix.is_empty() {
            "/"
        } else {
            request.prefix.as_str()
        };
        let max_keys = request.max_keys.clamp(1, MAX_KEYS);
        let recursive = request.delimiter.is_none();
        let marker = request.marker.as_deref();

        let mut list = self.operator.lister_with(path).recursive(recursive);
        if let Some(marker) = marker {
            if self.operator.info().full_capability().list_with_start_after {
                list = list.start_after(marker);
            }
        }
        let mut lister = list.await.map_err(|e| classify(path, e))?;

        let mut page = ListPage::default();
        let mut last = None;
        let mut count = 0;

        while let Some(entry) = lister.try_next().await.map_err(|e| classify(path, e))? {
            let key = entry.path();
            // Backends without start_after replay from the beginning.
            if key == "/" || marker.is_some_and(|m| key <= m) {
                continue;
            }
            if count == max_keys {
                page.next_marker = last;
                break;
            }

            let metadata = entry.metadata();
            if !recursive && metadata.is_dir() && key != request.prefix {
                page.common_prefixes.push(key.to_string());
            } else {
                page.objects.push(ObjectSummary {
                    key: key.to_string(),
                    size: metadata.content_length(),
                    last_modified: metadata.last_modified().unwrap_or_else(Utc::now),
                });
            }
            last = Some(key.to_string());
            count += 1;
        }

        Ok(page)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.operator.delete(key).await.map_err(|e| classify(key, e))
    }

    async fn copy_object(&self, from: &str, to: &str) -> StorageResult<()> {
        if is_folder_marker(from) {
            return self.operator.create_dir(to).await.map_err(|e| classify(to, e));
        }
        self.operator.copy(from, to).await.map_err(|e| classify(from, e))
    }
}

/// Factory building OpenDAL clients for the OSS and S3 backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorFactory;

impl ClientFactory for OperatorFactory {
    type Client = OpendalClient;

    fn build(&self, settings: &StorageSettings) -> StorageResult<OpendalClient> {
        OpendalClient::from_settings(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oss_settings() -> StorageSettings {
        StorageSettings::oss(
            "https://oss-cn-hangzhou.aliyuncs.com",
            "media",
            "https://media.example.com/",
            "key-id",
            "key-secret",
        )
    }

    #[test]
    fn test_build_oss_client() {
        assert!(OpendalClient::from_settings(&oss_settings()).is_ok());
    }

    #[test]
    fn test_build_s3_client() {
        let settings = oss_settings().with_s3_region("us-east-1");
        assert!(OperatorFactory.build(&settings).is_ok());
    }

    #[test]
    fn test_missing_credentials_fail_before_build() {
        let mut settings = oss_settings();
        settings.access_key_id = String::new();
        let err = OpendalClient::from_settings(&settings).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(msg) if msg.contains("access_key_id")));
    }

    #[test]
    fn test_memory_backend_rejected() {
        let settings = StorageSettings::memory("http://x.test/media");
        assert!(matches!(
            OperatorFactory.build(&settings),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_classify_names_missing_key() {
        let err = classify("a/b.jpg", opendal::Error::new(ErrorKind::NotFound, "404"));
        assert!(matches!(err, StorageError::NotFound { key } if key == "a/b.jpg"));
    }

    fn memory_client() -> OpendalClient {
        OpendalClient::new(Operator::new(services::Memory::default()).unwrap().finish())
    }

    async fn put(client: &OpendalClient, key: &str, body: &'static [u8]) {
        client
            .put_object(key, Bytes::from_static(body), ObjectAttributes::default())
            .await
            .unwrap();
    }

    async fn seed(client: &OpendalClient) {
        put(client, "a/1.txt", b"one").await;
        put(client, "a/sub/x.txt", b"x").await;
        put(client, "a/z.txt", b"zz").await;
        put(client, "a/empty/", b"").await;
    }

    fn file_keys(page: &ListPage) -> Vec<String> {
        let mut keys: Vec<String> = page
            .objects
            .iter()
            .map(|o| o.key.clone())
            .filter(|k| !k.ends_with('/'))
            .collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_put_then_head_and_get() {
        let client = memory_client();
        put(&client, "docs/readme.txt", b"hello").await;

        let head = client.head_object("docs/readme.txt").await.unwrap();
        assert_eq!(head.content_length, Some(5));
        assert_eq!(
            client.get_object("docs/readme.txt").await.unwrap(),
            Bytes::from_static(b"hello")
        );
    }

    #[tokio::test]
    async fn test_head_missing_is_not_found() {
        let err = memory_client().head_object("nope.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { key } if key == "nope.txt"));
    }

    #[tokio::test]
    async fn test_folder_marker_created_as_directory() {
        let client = memory_client();
        put(&client, "albums/", b"").await;

        let page = client
            .list_objects(&ListRequest::delimited(""))
            .await
            .unwrap();
        assert!(page.common_prefixes.contains(&"albums/".to_string()));
    }

    #[tokio::test]
    async fn test_delimited_listing_groups_folders() {
        let client = memory_client();
        seed(&client).await;

        let mut page = client
            .list_objects(&ListRequest::delimited("a/"))
            .await
            .unwrap();
        page.common_prefixes.sort();

        assert_eq!(file_keys(&page), vec!["a/1.txt", "a/z.txt"]);
        assert_eq!(page.common_prefixes, vec!["a/empty/", "a/sub/"]);
        assert_eq!(page.next_marker, None);
    }

    #[tokio::test]
    async fn test_recursive_listing_reports_markers_as_objects() {
        let client = memory_client();
        seed(&client).await;

        let page = client
            .list_objects(&ListRequest::recursive("a/"))
            .await
            .unwrap();
        let keys: Vec<&str> = page.objects.iter().map(|o| o.key.as_str()).collect();

        assert!(page.common_prefixes.is_empty());
        assert!(keys.contains(&"a/empty/"));
        assert!(keys.contains(&"a/sub/x.txt"));
        assert!(page.objects.iter().all(|o| o.last_modified.timestamp() > 0));
    }

    #[tokio::test]
    async fn test_pagination_resumes_after_common_prefix() {
        let client = memory_client();
        seed(&client).await;

        let mut files = Vec::new();
        let mut prefixes = Vec::new();
        let mut marker = None;
        let mut pages = 0;
        loop {
            pages += 1;
            assert!(pages < 20, "listing did not terminate");
            let request = ListRequest::delimited("a/")
                .with_max_keys(1)
                .with_marker(marker);
            let page = client.list_objects(&request).await.unwrap();
            files.extend(file_keys(&page));
            prefixes.extend(page.common_prefixes);
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        files.sort();
        prefixes.sort();
        assert_eq!(files, vec!["a/1.txt", "a/z.txt"]);
        assert_eq!(prefixes, vec!["a/empty/", "a/sub/"]);
        assert!(pages >= 4);
    }

    #[tokio::test]
    async fn test_zero_max_keys_still_makes_progress() {
        let client = memory_client();
        seed(&client).await;

        let page = client
            .list_objects(&ListRequest::recursive("a/").with_max_keys(0))
            .await
            .unwrap();
        assert_eq!(page.objects.len(), 1);
        assert!(page.next_marker.is_some());
    }

    #[tokio::test]
    async fn test_copy_marker_and_delete() {
        let client = memory_client();
        put(&client, "old/", b"").await;

        client.copy_object("old/", "new/").await.unwrap();
        client.delete_object("old/").await.unwrap();

        let page = client
            .list_objects(&ListRequest::delimited(""))
            .await
            .unwrap();
        assert_eq!(page.common_prefixes, vec!["new/"]);
    }

    #[tokio::test]
    async fn test_delete_file() {
        let client = memory_client();
        put(&client, "a.txt", b"a").await;

        client.delete_object("a.txt").await.unwrap();
        assert!(client.head_object("a.txt").await.unwrap_err().is_not_found());
    }
}
