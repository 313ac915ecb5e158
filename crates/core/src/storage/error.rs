//! Storage error types.

use thiserror::Error;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage operation errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Missing or invalid credentials, endpoint or bucket.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Path does not start with `/` or reduces to the empty key.
    #[error("invalid storage path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Object or prefix not found in storage.
    #[error("not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Object metadata could not be decoded.
    #[error("failed to decode metadata for '{key}': {reason}")]
    Decode {
        /// Storage key whose metadata was unreadable.
        key: String,
        /// What was malformed.
        reason: String,
    },

    /// Network or service fault, including throttling.
    #[error("transient storage failure: {0}")]
    Transient(String),

    /// Permanent store fault such as permission denied.
    #[error("storage operation failed: {0}")]
    Store(String),

    /// Uploaded image could not be decoded or re-encoded.
    #[error("image processing failed: {0}")]
    ImageProcessing(String),

    /// Operation deliberately unsupported by this provider.
    #[error("operation not supported: {operation}")]
    NotImplemented {
        /// Name of the unsupported operation.
        operation: &'static str,
    },
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid path error.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a transient error.
    #[must_use]
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a permanent store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an image processing error.
    #[must_use]
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Create a not implemented error.
    #[must_use]
    pub fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::RateLimited => Self::Transient(err.to_string()),
            _ if err.is_temporary() => Self::Transient(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            opendal::ErrorKind::Unsupported => Self::NotImplemented {
                operation: "unsupported by storage backend",
            },
            _ => Self::Store(err.to_string()),
        }
    }
}

impl From<cirrus_shared::SettingsError> for StorageError {
    fn from(err: cirrus_shared::SettingsError) -> Self {
        Self::Configuration(err.to_string())
    }
}
