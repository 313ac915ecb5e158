//! Object-store client boundary.
//!
//! The provider talks to the bucket only through [`ObjectClient`]. Keys are
//! flat strings; "folders" exist only as shared prefixes and as zero-length
//! marker objects whose key ends in `/`.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::error::StorageResult;

/// Largest page an object store returns for one listing request.
pub const MAX_KEYS: usize = 1000;

/// Attributes stored alongside an uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectAttributes {
    /// `Content-Type` of the object.
    pub content_type: String,
    /// User metadata (the sidecar).
    pub user_metadata: HashMap<String, String>,
}

/// Result of a metadata-only fetch.
///
/// Every field is optional because backends differ in what they report;
/// the provider decides which absences are fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    /// `Content-Type` of the object.
    pub content_type: Option<String>,
    /// Object size in bytes.
    pub content_length: Option<u64>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// User metadata (the sidecar).
    pub user_metadata: HashMap<String, String>,
}

/// One object in a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// Parameters of a single listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix are listed.
    pub prefix: String,
    /// Group keys sharing a prefix up to this delimiter.
    pub delimiter: Option<char>,
    /// Maximum number of objects plus common prefixes in the page.
    pub max_keys: usize,
    /// Only keys strictly after this one are listed.
    pub marker: Option<String>,
}

impl ListRequest {
    /// Delimited listing of the direct children of `prefix`.
    #[must_use]
    pub fn delimited(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: Some('/'),
            max_keys: MAX_KEYS,
            marker: None,
        }
    }

    /// Flat listing of every key under `prefix`.
    #[must_use]
    pub fn recursive(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: None,
            max_keys: MAX_KEYS,
            marker: None,
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Continue after `marker`.
    #[must_use]
    pub fn with_marker(mut self, marker: Option<String>) -> Self {
        self.marker = marker;
        self
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects directly matching the request.
    pub objects: Vec<ObjectSummary>,
    /// Distinct prefixes ending in the delimiter.
    pub common_prefixes: Vec<String>,
    /// Marker for the next page, `None` when the listing is complete.
    pub next_marker: Option<String>,
}

/// Operations the storage provider needs from an object store.
///
/// Implementations report a missing key as `StorageError::NotFound` and keep
/// it distinct from `StorageError::Transient`.
pub trait ObjectClient: Send + Sync {
    /// Store `body` at `key`, replacing any existing object.
    fn put_object(
        &self,
        key: &str,
        body: Bytes,
        attributes: ObjectAttributes,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Fetch metadata without transferring the body.
    fn head_object(&self, key: &str) -> impl Future<Output = StorageResult<ObjectHead>> + Send;

    /// Fetch the full object body.
    fn get_object(&self, key: &str) -> impl Future<Output = StorageResult<Bytes>> + Send;

    /// List one page of keys.
    fn list_objects(
        &self,
        request: &ListRequest,
    ) -> impl Future<Output = StorageResult<ListPage>> + Send;

    /// Delete the object at `key`. Deleting a missing key succeeds.
    fn delete_object(&self, key: &str) -> impl Future<Output = StorageResult<()>> + Send;

    /// Copy an object with its attributes.
    fn copy_object(&self, from: &str, to: &str) -> impl Future<Output = StorageResult<()>> + Send;
}
