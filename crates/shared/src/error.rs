//! Settings error types.

use thiserror::Error;

/// Result type alias using `SettingsError`.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised while loading or validating site settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A required setting is absent or blank.
    #[error("missing required storage setting: {0}")]
    Missing(&'static str),

    /// A setting is present but cannot be used.
    #[error("invalid storage setting {field}: {reason}")]
    Invalid {
        /// Name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration sources could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(String),
}

impl SettingsError {
    /// Create an invalid setting error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for SettingsError {
    fn from(err: config::ConfigError) -> Self {
        Self::Load(err.to_string())
    }
}
