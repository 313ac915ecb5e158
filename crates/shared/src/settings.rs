//! Object-storage site settings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};

/// Which object-storage service the settings point at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Aliyun Object Storage Service.
    #[default]
    Oss,
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO.
    S3,
    /// Process-local store for development and tests.
    Memory,
}

impl BackendKind {
    /// Get the backend name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Oss => "oss",
            Self::S3 => "s3",
            Self::Memory => "memory",
        }
    }
}

/// Cloud credentials and addressing for the media bucket.
///
/// Owned by the host's site configuration. The storage layer only reads it,
/// once per operation, so edits take effect on the next call.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Object-storage service flavour.
    #[serde(default)]
    pub backend: BackendKind,
    /// Service endpoint URL.
    #[serde(default)]
    pub endpoint: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Base URL under which stored files are publicly served.
    #[serde(default)]
    pub public_entry_url: String,
    /// Access key id.
    #[serde(default)]
    pub access_key_id: String,
    /// Access key secret.
    #[serde(default)]
    pub access_key_secret: String,
    /// Region, only used by S3-compatible backends.
    #[serde(default)]
    pub region: Option<String>,
}

impl StorageSettings {
    /// Create Aliyun OSS settings.
    #[must_use]
    pub fn oss(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        public_entry_url: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendKind::Oss,
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            public_entry_url: public_entry_url.into(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region: None,
        }
    }

    /// Create settings for the in-memory backend.
    #[must_use]
    pub fn memory(public_entry_url: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Memory,
            bucket: "memory".to_string(),
            public_entry_url: public_entry_url.into(),
            ..Self::default()
        }
    }

    /// Switch to an S3-compatible backend in the given region.
    #[must_use]
    pub fn with_s3_region(mut self, region: impl Into<String>) -> Self {
        self.backend = BackendKind::S3;
        self.region = Some(region.into());
        self
    }

    /// Check that every required setting is present.
    ///
    /// Absent credentials fail here, before any client is built, rather than
    /// at the first store call.
    ///
    /// The memory backend only needs `public_entry_url`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Missing` for the first blank field and
    /// `SettingsError::Invalid` when a URL setting does not parse as an
    /// absolute URL.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.public_entry_url.trim().is_empty() {
            return Err(SettingsError::Missing("public_entry_url"));
        }
        url::Url::parse(&self.public_entry_url)
            .map_err(|e| SettingsError::invalid("public_entry_url", e.to_string()))?;

        if self.backend == BackendKind::Memory {
            return Ok(());
        }

        let required = [
            ("endpoint", &self.endpoint),
            ("bucket", &self.bucket),
            ("access_key_id", &self.access_key_id),
            ("access_key_secret", &self.access_key_secret),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SettingsError::Missing(field));
            }
        }

        url::Url::parse(&self.endpoint)
            .map_err(|e| SettingsError::invalid("endpoint", e.to_string()))?;

        if self.backend == BackendKind::S3 && self.region.as_deref().is_none_or(str::is_empty) {
            return Err(SettingsError::Missing("region"));
        }

        Ok(())
    }
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("public_entry_url", &self.public_entry_url)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}
