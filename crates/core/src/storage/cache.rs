//! Object-store client caching.
//!
//! Building a client is comparatively expensive, so one client is kept per
//! distinct credential set. When the site settings change, the client for
//! the previous credentials is dropped.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use cirrus_shared::{BackendKind, StorageSettings};
use moka::sync::Cache;
use tracing::{debug, info};

use super::client::ObjectClient;
use super::error::StorageResult;

/// Default number of clients kept alive at once.
const DEFAULT_CACHE_CAPACITY: u64 = 8;

/// Builds object-store clients from site settings.
pub trait ClientFactory: Send + Sync {
    /// Client type produced by this factory.
    type Client: ObjectClient + Clone + 'static;

    /// Build a client for the given settings.
    fn build(&self, settings: &StorageSettings) -> StorageResult<Self::Client>;
}

/// Factory that hands out clones of one pre-built client.
///
/// Used for the in-memory backend and in tests.
#[derive(Debug, Clone)]
pub struct StaticClientFactory<C> {
    client: C,
}

impl<C> StaticClientFactory<C> {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: ObjectClient + Clone + 'static> ClientFactory for StaticClientFactory<C> {
    type Client = C;

    fn build(&self, _settings: &StorageSettings) -> StorageResult<C> {
        Ok(self.client.clone())
    }
}

/// Identity of a credential set.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    backend: BackendKind,
    endpoint: String,
    bucket: String,
    region: Option<String>,
    access_key_id: String,
    access_key_secret: String,
}

impl From<&StorageSettings> for ClientKey {
    fn from(settings: &StorageSettings) -> Self {
        Self {
            backend: settings.backend,
            endpoint: settings.endpoint.clone(),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            access_key_id: settings.access_key_id.clone(),
            access_key_secret: settings.access_key_secret.clone(),
        }
    }
}

impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientKey")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Cache of object-store clients keyed by credential set.
///
/// Thread-safe. Concurrent requests for a missing client build it once.
pub struct ClientCache<F: ClientFactory> {
    factory: F,
    cache: Cache<ClientKey, F::Client>,
    current: Mutex<Option<ClientKey>>,
}

impl<F: ClientFactory> ClientCache<F> {
    /// Creates a new client cache with default settings.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self::with_capacity(factory, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a new client cache holding at most `max_capacity` clients.
    #[must_use]
    pub fn with_capacity(factory: F, max_capacity: u64) -> Self {
        Self {
            factory,
            cache: Cache::builder().max_capacity(max_capacity).build(),
            current: Mutex::new(None),
        }
    }

    /// Get the client for `settings`, building it on first use.
    ///
    /// The client of the previously used credential set is invalidated when
    /// the credentials differ.
    pub fn client(&self, settings: &StorageSettings) -> StorageResult<F::Client> {
        let key = ClientKey::from(settings);

        let client = self
            .cache
            .try_get_with(key.clone(), || {
                info!(
                    backend = settings.backend.name(),
                    endpoint = %settings.endpoint,
                    bucket = %settings.bucket,
                    "Building object storage client"
                );
                self.factory.build(settings)
            })
            .map_err(Arc::unwrap_or_clone)?;

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref() != Some(&key) {
            if let Some(previous) = current.replace(key) {
                debug!(bucket = %previous.bucket, "Storage settings changed, dropping old client");
                self.cache.invalidate(&previous);
            }
        }

        Ok(client)
    }

    /// Drop every cached client.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the number of clients currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}
