//! Application configuration management.

use serde::Deserialize;

use crate::error::{SettingsError, SettingsResult};
use crate::settings::StorageSettings;

/// Upper bound the object stores accept for one listing page.
pub const MAX_LIST_KEYS: usize = 1000;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Object-storage site settings.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Folder listing behaviour.
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Folder listing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ListingConfig {
    /// Page size requested from the object store.
    #[serde(default = "default_max_keys")]
    pub max_keys: usize,
    /// Follow continuation markers until the listing is complete.
    #[serde(default = "default_paginate")]
    pub paginate: bool,
    /// Report listing failures as an empty result instead of an error.
    #[serde(default)]
    pub empty_on_error: bool,
}

fn default_max_keys() -> usize {
    MAX_LIST_KEYS
}

fn default_paginate() -> bool {
    true
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_keys: default_max_keys(),
            paginate: default_paginate(),
            empty_on_error: false,
        }
    }
}

impl ListingConfig {
    /// Check the page size is one the object stores accept.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` when `max_keys` is zero or above
    /// [`MAX_LIST_KEYS`].
    pub fn validate(&self) -> SettingsResult<()> {
        if self.max_keys == 0 || self.max_keys > MAX_LIST_KEYS {
            return Err(SettingsError::invalid(
                "listing.max_keys",
                format!("must be between 1 and {MAX_LIST_KEYS}, got {}", self.max_keys),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Loads configuration from `.env`, the `config/` directory and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or fails
    /// validation.
    pub fn load() -> SettingsResult<Self> {
        dotenvy::dotenv().ok();
        Self::load_from("config")
    }

    /// Loads configuration from `{dir}/default`, `{dir}/{RUN_MODE}` and
    /// `CIRRUS_`-prefixed environment variables, later sources winning.
    ///
    /// Nested keys use `__`, so `CIRRUS_STORAGE__BUCKET` sets
    /// `storage.bucket`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or fails
    /// validation.
    pub fn load_from(dir: &str) -> SettingsResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("CIRRUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.storage.validate()?;
        config.listing.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BackendKind;

    const NO_CONFIG_DIR: &str = "does-not-exist";

    fn storage_env() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("CIRRUS_STORAGE__ENDPOINT", Some("https://oss-cn-hangzhou.aliyuncs.com")),
            ("CIRRUS_STORAGE__BUCKET", Some("media")),
            ("CIRRUS_STORAGE__PUBLIC_ENTRY_URL", Some("https://media.example.com/")),
            ("CIRRUS_STORAGE__ACCESS_KEY_ID", Some("key-id")),
            ("CIRRUS_STORAGE__ACCESS_KEY_SECRET", Some("key-secret")),
        ]
    }

    #[test]
    fn test_listing_defaults() {
        let listing = ListingConfig::default();
        assert_eq!(listing.max_keys, 1000);
        assert!(listing.paginate);
        assert!(!listing.empty_on_error);
        assert!(listing.validate().is_ok());
    }

    #[test]
    fn test_listing_page_size_bounds() {
        let mut listing = ListingConfig::default();
        listing.max_keys = 0;
        assert!(listing.validate().is_err());
        listing.max_keys = 1001;
        assert!(listing.validate().is_err());
        listing.max_keys = 1;
        assert!(listing.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(storage_env(), || {
            let config = AppConfig::load_from(NO_CONFIG_DIR).unwrap();
            assert_eq!(config.storage.backend, BackendKind::Oss);
            assert_eq!(config.storage.bucket, "media");
            assert_eq!(config.storage.access_key_id, "key-id");
            assert_eq!(config.listing, ListingConfig::default());
        });
    }

    #[test]
    fn test_load_listing_overrides() {
        let mut vars = storage_env();
        vars.push(("CIRRUS_LISTING__MAX_KEYS", Some("50")));
        vars.push(("CIRRUS_LISTING__PAGINATE", Some("false")));
        temp_env::with_vars(vars, || {
            let config = AppConfig::load_from(NO_CONFIG_DIR).unwrap();
            assert_eq!(config.listing.max_keys, 50);
            assert!(!config.listing.paginate);
        });
    }

    #[test]
    fn test_load_fails_fast_without_credentials() {
        let vars = storage_env()
            .into_iter()
            .map(|(k, v)| {
                if k == "CIRRUS_STORAGE__ACCESS_KEY_SECRET" {
                    (k, None)
                } else {
                    (k, v)
                }
            })
            .collect::<Vec<_>>();
        temp_env::with_vars(vars, || {
            let err = AppConfig::load_from(NO_CONFIG_DIR).unwrap_err();
            assert_eq!(err, SettingsError::Missing("access_key_secret"));
        });
    }
}
