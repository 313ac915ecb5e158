//! In-memory object store.
//!
//! Keeps objects in a sorted map and answers listings with the same
//! prefix/delimiter/marker rules as OSS and S3. Used by the `memory` backend
//! and by tests. Clones share the same bucket.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::client::{ListPage, ListRequest, ObjectAttributes, ObjectClient, ObjectHead, ObjectSummary};
use super::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    attributes: ObjectAttributes,
    last_modified: DateTime<Utc>,
}

/// Object store backed by a shared `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl InMemoryClient {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects, folder markers included.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// All keys in lexicographic order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

/// Common prefix `key` belongs to under `prefix`, if any.
fn common_prefix(key: &str, prefix: &str, delimiter: char) -> Option<String> {
    let rest = key.strip_prefix(prefix)?;
    rest.find(delimiter)
        .map(|pos| format!("{prefix}{}", &rest[..pos + delimiter.len_utf8()]))
}

impl ObjectClient for InMemoryClient {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        attributes: ObjectAttributes,
    ) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::invalid_path("", "empty object key"));
        }
        let object = StoredObject {
            body,
            attributes,
            last_modified: Utc::now(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn head_object(&self, key: &str) -> StorageResult<ObjectHead> {
        let objects = self.objects.read().await;
        let object = objects.get(key).ok_or_else(|| StorageError::not_found(key))?;
        Ok(ObjectHead {
            content_type: Some(object.attributes.content_type.clone()),
            content_length: Some(object.body.len() as u64),
            last_modified: Some(object.last_modified),
            user_metadata: object.attributes.user_metadata.clone(),
        })
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|object| object.body.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn list_objects(&self, request: &ListRequest) -> StorageResult<ListPage> {
        let max_keys = request.max_keys.clamp(1, super::client::MAX_KEYS);
        let lower = match &request.marker {
            Some(marker) => Bound::Excluded(marker.clone()),
            None => Bound::Unbounded,
        };

        let objects = self.objects.read().await;
        let mut page = ListPage::default();
        let mut count = 0;
        let mut last = None;

        for (key, object) in objects.range((lower, Bound::Unbounded)) {
            if !key.starts_with(&request.prefix) {
                if key.as_str() > request.prefix.as_str() {
                    break;
                }
                continue;
            }

            let grouped = request
                .delimiter
                .and_then(|delimiter| common_prefix(key, &request.prefix, delimiter));

            if let Some(prefix) = grouped {
                // Keys under a prefix are contiguous, so a repeat is always the last one seen.
                if request.marker.as_ref() == Some(&prefix)
                    || page.common_prefixes.last() == Some(&prefix)
                {
                    continue;
                }
                if count == max_keys {
                    page.next_marker = last;
                    return Ok(page);
                }
                last = Some(prefix.clone());
                page.common_prefixes.push(prefix);
            } else {
                if count == max_keys {
                    page.next_marker = last;
                    return Ok(page);
                }
                last = Some(key.clone());
                page.objects.push(ObjectSummary {
                    key: key.clone(),
                    size: object.body.len() as u64,
                    last_modified: object.last_modified,
                });
            }
            count += 1;
        }

        Ok(page)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn copy_object(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().await;
        let mut object = objects
            .get(from)
            .cloned()
            .ok_or_else(|| StorageError::not_found(from))?;
        object.last_modified = Utc::now();
        objects.insert(to.to_string(), object);
        Ok(())
    }
}
