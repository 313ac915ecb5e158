//! Storage provider façade.
//!
//! Implements the host media library's storage contract on top of an
//! [`ObjectClient`]. Settings are read on every call, and the matching
//! client comes from a [`ClientCache`].

use std::collections::HashSet;

use bytes::Bytes;
use cirrus_shared::{ListingConfig, StorageSettings};
use tracing::{debug, error, info, warn};

use super::cache::{ClientCache, ClientFactory};
use super::client::{ListPage, ListRequest, MAX_KEYS, ObjectAttributes, ObjectClient};
use super::error::{StorageError, StorageResult};
use super::key;
use super::settings::SettingsSource;
use super::sidecar;
use super::types::{FileWriter, StorageFile, StorageFolder};
use super::url;
use crate::media;

/// How folder listings are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    /// Page size requested from the store.
    pub max_keys: usize,
    /// Follow continuation markers until the listing is complete.
    pub paginate: bool,
    /// Log listing failures and return an empty result.
    pub empty_on_error: bool,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            max_keys: MAX_KEYS,
            paginate: true,
            empty_on_error: false,
        }
    }
}

impl ListingOptions {
    /// One request per listing, capped at `max_keys` entries.
    #[must_use]
    pub fn single_page() -> Self {
        Self {
            paginate: false,
            ..Self::default()
        }
    }

    /// Report listing failures as an empty result.
    #[must_use]
    pub fn empty_on_error(mut self) -> Self {
        self.empty_on_error = true;
        self
    }
}

impl From<ListingConfig> for ListingOptions {
    fn from(config: ListingConfig) -> Self {
        Self {
            max_keys: config.max_keys,
            paginate: config.paginate,
            empty_on_error: config.empty_on_error,
        }
    }
}

/// Provider behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Listing behaviour.
    pub listing: ListingOptions,
    /// Report copy, delete and rename operations as not implemented.
    pub legacy: bool,
}

/// Storage provider backed by an object-store bucket.
pub struct StorageProvider<S: SettingsSource, F: ClientFactory> {
    settings: S,
    clients: ClientCache<F>,
    options: ProviderOptions,
}

impl<S: SettingsSource, F: ClientFactory> StorageProvider<S, F> {
    /// Create a provider with default options.
    #[must_use]
    pub fn new(settings: S, factory: F) -> Self {
        Self::with_options(settings, factory, ProviderOptions::default())
    }

    /// Create a provider with explicit options.
    #[must_use]
    pub fn with_options(settings: S, factory: F, options: ProviderOptions) -> Self {
        Self {
            settings,
            clients: ClientCache::new(factory),
            options,
        }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> ProviderOptions {
        self.options
    }

    /// Current settings, validated.
    fn settings(&self) -> StorageResult<StorageSettings> {
        let settings = self.settings.storage_settings()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Client for the current settings.
    fn client(&self) -> StorageResult<F::Client> {
        let settings = self.settings()?;
        self.clients.client(&settings)
    }

    fn ensure_supported(&self, operation: &'static str) -> StorageResult<()> {
        if self.options.legacy {
            return Err(StorageError::not_implemented(operation));
        }
        Ok(())
    }

    /// Join two path fragments.
    #[must_use]
    pub fn combine(&self, parent: &str, child: &str) -> String {
        key::combine(parent, child)
    }

    /// Fetch a file's metadata without its body.
    ///
    /// `path` may also be an http(s) URL, typically one returned by
    /// [`Self::get_public_url`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for a missing object, distinct from
    /// `StorageError::Transient` for network faults.
    pub async fn get_file(&self, path: &str) -> StorageResult<StorageFile> {
        let settings = self.settings()?;
        let path = url::normalize_path(&settings.public_entry_url, path)?;
        let key = key::require_object_key(&path)?;
        let client = self.clients.client(&settings)?;

        let head = client.head_object(key).await.inspect_err(|e| {
            if e.is_not_found() {
                debug!(key, "File not found");
            } else {
                warn!(key, error = %e, "Failed to fetch file metadata");
            }
        })?;

        StorageFile::from_head(path, head)
    }

    /// Full content of a file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for a missing object.
    pub async fn read_file(&self, path: &str) -> StorageResult<Bytes> {
        let key = key::require_object_key(path)?;
        self.client()?.get_object(key).await
    }

    /// Open a write handle; nothing is stored until it is finished.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` for paths that cannot hold a file.
    pub fn create_file(&self, path: &str) -> StorageResult<FileWriter<'_, S, F>> {
        key::require_object_key(path)?;
        Ok(FileWriter::new(self, path.to_string()))
    }

    /// Store `content` at `path`, replacing any existing file.
    ///
    /// Raster images are made upright and measured before upload; their
    /// width and height are kept as object attributes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` before any write if `path` does
    /// not start with `/`, `StorageError::ImageProcessing` for undecodable
    /// images, and the store error if the upload fails.
    pub async fn save_stream(&self, path: &str, content: impl Into<Bytes>) -> StorageResult<()> {
        let key = key::require_object_key(path)?.to_string();
        let client = self.client()?;

        let content = content.into();
        let owned_path = path.to_string();
        let upload = tokio::task::spawn_blocking(move || media::process_upload(&owned_path, content))
            .await
            .map_err(|e| StorageError::image(e.to_string()))??;

        let user_metadata = match upload.dimensions {
            Some((width, height)) => sidecar::encode(width, height, &upload.mime_type),
            None => sidecar::encode_mime_only(&upload.mime_type),
        };
        let attributes = ObjectAttributes {
            content_type: upload.mime_type,
            user_metadata,
        };
        let size = upload.body.len();

        client
            .put_object(&key, upload.body, attributes)
            .await
            .inspect_err(|e| error!(key = %key, error = %e, "Failed to save file"))?;

        info!(key = %key, size, "File saved");
        Ok(())
    }

    /// Store `content` unless a file already exists at `path`.
    ///
    /// Returns `false` without writing when the file exists.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save_stream`].
    pub async fn try_save_stream(&self, path: &str, content: impl Into<Bytes>) -> StorageResult<bool> {
        if self.file_exists(path).await? {
            return Ok(false);
        }
        self.save_stream(path, content).await?;
        Ok(true)
    }

    /// Whether an object exists at exactly `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` or the store error.
    pub async fn file_exists(&self, path: &str) -> StorageResult<bool> {
        let key = key::require_object_key(path)?;
        let page = self
            .client()?
            .list_objects(&ListRequest::recursive(key))
            .await?;
        Ok(page.objects.iter().any(|object| object.key == key))
    }

    /// Whether a folder exists at `path`, as a marker or a shared prefix.
    ///
    /// The root folder always exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` or the store error.
    pub async fn folder_exists(&self, path: &str) -> StorageResult<bool> {
        let folder_key = key::to_folder_key(path)?;
        if folder_key.is_empty() {
            return Ok(true);
        }

        let client = self.client()?;
        let prefix = folder_key.trim_end_matches(key::SEPARATOR);
        let mut marker = None;
        loop {
            let request = ListRequest::delimited(prefix).with_marker(marker);
            let page = client.list_objects(&request).await?;
            let found = page.common_prefixes.iter().any(|p| *p == folder_key)
                || page.objects.iter().any(|o| o.key == folder_key);
            if found {
                return Ok(true);
            }
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => return Ok(false),
            }
        }
    }

    /// Create an empty folder marker at `path`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` for relative paths and the root.
    pub async fn create_folder(&self, path: &str) -> StorageResult<()> {
        let folder_key = key::to_folder_key(path)?;
        if folder_key.is_empty() {
            return Err(StorageError::invalid_path(path, "the root folder always exists"));
        }
        self.client()?
            .put_object(&folder_key, Bytes::new(), ObjectAttributes::default())
            .await?;
        info!(key = %folder_key, "Folder created");
        Ok(())
    }

    /// Create a folder unless it already exists.
    ///
    /// Returns `false` when the folder was already there.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_folder`].
    pub async fn try_create_folder(&self, path: &str) -> StorageResult<bool> {
        if self.folder_exists(path).await? {
            return Ok(false);
        }
        self.create_folder(path).await?;
        Ok(true)
    }

    /// Copy a file with its attributes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the source is missing and
    /// `StorageError::NotImplemented` in legacy mode.
    pub async fn copy_file(&self, from: &str, to: &str) -> StorageResult<()> {
        self.ensure_supported("copy_file")?;
        let from_key = key::require_object_key(from)?;
        let to_key = key::require_object_key(to)?;
        self.client()?.copy_object(from_key, to_key).await?;
        info!(from = from_key, to = to_key, "File copied");
        Ok(())
    }

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the file is missing and
    /// `StorageError::NotImplemented` in legacy mode.
    pub async fn delete_file(&self, path: &str) -> StorageResult<()> {
        self.ensure_supported("delete_file")?;
        let key = key::require_object_key(path)?;
        let client = self.client()?;
        client.head_object(key).await?;
        client.delete_object(key).await?;
        info!(key, "File deleted");
        Ok(())
    }

    /// Move a file: copy, then delete the source.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the source is missing and
    /// `StorageError::NotImplemented` in legacy mode.
    pub async fn rename_file(&self, from: &str, to: &str) -> StorageResult<()> {
        self.ensure_supported("rename_file")?;
        let from_key = key::require_object_key(from)?;
        let to_key = key::require_object_key(to)?;
        if from_key == to_key {
            return Ok(());
        }
        let client = self.client()?;
        client.copy_object(from_key, to_key).await?;
        client.delete_object(from_key).await?;
        info!(from = from_key, to = to_key, "File renamed");
        Ok(())
    }

    /// Delete a folder and everything under it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored under the
    /// folder, `StorageError::InvalidPath` for the root and
    /// `StorageError::NotImplemented` in legacy mode.
    pub async fn delete_folder(&self, path: &str) -> StorageResult<()> {
        self.ensure_supported("delete_folder")?;
        let folder_key = require_folder_key(path)?;
        let client = self.client()?;

        let keys = self.keys_under(&client, &folder_key).await?;
        if keys.is_empty() {
            return Err(StorageError::not_found(folder_key));
        }
        for key in &keys {
            client.delete_object(key).await?;
        }
        info!(key = %folder_key, objects = keys.len(), "Folder deleted");
        Ok(())
    }

    /// Move a folder and everything under it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored under the
    /// source, `StorageError::InvalidPath` for the root or a target inside
    /// the source, and `StorageError::NotImplemented` in legacy mode.
    pub async fn rename_folder(&self, from: &str, to: &str) -> StorageResult<()> {
        self.ensure_supported("rename_folder")?;
        let from_key = require_folder_key(from)?;
        let to_key = require_folder_key(to)?;
        if from_key == to_key {
            return Ok(());
        }
        if to_key.starts_with(&from_key) {
            return Err(StorageError::invalid_path(to, "cannot move a folder into itself"));
        }
        let client = self.client()?;

        let keys = self.keys_under(&client, &from_key).await?;
        if keys.is_empty() {
            return Err(StorageError::not_found(from_key));
        }
        for key in &keys {
            let target = format!("{to_key}{}", &key[from_key.len()..]);
            client.copy_object(key, &target).await?;
        }
        for key in &keys {
            client.delete_object(key).await?;
        }
        info!(from = %from_key, to = %to_key, objects = keys.len(), "Folder renamed");
        Ok(())
    }

    /// Every key under `prefix`, following all pages.
    async fn keys_under(&self, client: &F::Client, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut marker = None;
        loop {
            let request = ListRequest::recursive(prefix)
                .with_max_keys(self.options.listing.max_keys)
                .with_marker(marker);
            let page = client.list_objects(&request).await?;
            keys.extend(page.objects.into_iter().map(|o| o.key));
            match page.next_marker {
                Some(next) => marker = Some(next),
                None => return Ok(keys),
            }
        }
    }

    /// Delimited listing of `path`, merged across pages.
    async fn list(&self, path: &str) -> StorageResult<ListPage> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            key::to_folder_key(path)?
        };
        let client = self.client()?;
        let listing = self.options.listing;

        let mut merged = ListPage::default();
        let mut seen = HashSet::new();
        let mut marker = None;
        loop {
            let request = ListRequest::delimited(prefix.as_str())
                .with_max_keys(listing.max_keys)
                .with_marker(marker);
            let page = client.list_objects(&request).await?;

            merged.objects.extend(page.objects);
            for common in page.common_prefixes {
                if seen.insert(common.clone()) {
                    merged.common_prefixes.push(common);
                }
            }

            match page.next_marker {
                Some(next) if listing.paginate => marker = Some(next),
                Some(next) => {
                    warn!(prefix = %prefix, max_keys = listing.max_keys, "Listing truncated");
                    merged.next_marker = Some(next);
                    return Ok(merged);
                }
                None => return Ok(merged),
            }
        }
    }

    fn listing_failure<T>(&self, path: &str, err: StorageError) -> StorageResult<Vec<T>> {
        if self.options.listing.empty_on_error {
            error!(path, error = %err, "Listing failed, returning empty result");
            Ok(Vec::new())
        } else {
            Err(err)
        }
    }

    /// Files directly inside the folder at `path` (`""` or `"/"` for root).
    ///
    /// Dimensions and mime type are unknown until [`Self::get_file`].
    ///
    /// # Errors
    ///
    /// Returns the store error unless empty results on error are enabled.
    pub async fn list_files(&self, path: &str) -> StorageResult<Vec<StorageFile>> {
        match self.list(path).await {
            Ok(page) => Ok(page
                .objects
                .iter()
                .filter(|object| !object.key.ends_with(key::SEPARATOR))
                .map(StorageFile::from_summary)
                .collect()),
            Err(e) => self.listing_failure(path, e),
        }
    }

    /// Folders directly inside the folder at `path` (`""` or `"/"` for root).
    ///
    /// # Errors
    ///
    /// Returns the store error unless empty results on error are enabled.
    pub async fn list_folders(&self, path: &str) -> StorageResult<Vec<StorageFolder>> {
        match self.list(path).await {
            Ok(page) => Ok(page
                .common_prefixes
                .iter()
                .map(|prefix| StorageFolder::from_prefix(prefix))
                .collect()),
            Err(e) => self.listing_failure(path, e),
        }
    }

    /// Public URL under which `path` is served.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if the public entry URL is
    /// invalid.
    pub fn get_public_url(&self, path: &str) -> StorageResult<String> {
        let settings = self.settings()?;
        url::public_url(&settings.public_entry_url, path)
    }

    /// Virtual path of a public URL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if `url` is not an absolute URL.
    pub fn get_storage_path(&self, url: &str) -> StorageResult<String> {
        let settings = self.settings()?;
        url::storage_path_under(&settings.public_entry_url, url)
    }

    /// URL of `path` rendered through an image processing profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the file is missing.
    pub async fn image_profile_url(&self, path: &str, profile: &str) -> StorageResult<String> {
        let public_url = self.get_public_url(path)?;
        let file = self.get_file(path).await?;
        Ok(url::profile_url(&public_url, profile, file.last_modified()))
    }
}

/// Folder key of a non-root folder path.
fn require_folder_key(path: &str) -> StorageResult<String> {
    let folder_key = key::to_folder_key(path)?;
    if folder_key.is_empty() {
        return Err(StorageError::invalid_path(path, "operation not allowed on the root folder"));
    }
    Ok(folder_key)
}
