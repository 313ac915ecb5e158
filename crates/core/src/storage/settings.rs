//! Where the provider reads its site settings from.

use std::sync::{Arc, PoisonError, RwLock};

use cirrus_shared::StorageSettings;

use super::error::StorageResult;

/// Source of the current storage settings.
///
/// Read once per provider operation, so the host can change credentials at
/// runtime without rebuilding the provider.
pub trait SettingsSource: Send + Sync {
    /// Snapshot of the current settings.
    fn storage_settings(&self) -> StorageResult<StorageSettings>;
}

impl SettingsSource for StorageSettings {
    fn storage_settings(&self) -> StorageResult<StorageSettings> {
        Ok(self.clone())
    }
}

impl<T: SettingsSource + ?Sized> SettingsSource for Arc<T> {
    fn storage_settings(&self) -> StorageResult<StorageSettings> {
        (**self).storage_settings()
    }
}

/// Settings the host can replace while the provider is running.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<StorageSettings>>,
}

impl SharedSettings {
    /// Create from initial settings.
    #[must_use]
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the settings; the next provider call picks them up.
    pub fn update(&self, settings: StorageSettings) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}

impl SettingsSource for SharedSettings {
    fn storage_settings(&self) -> StorageResult<StorageSettings> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_settings_update() {
        let shared = SharedSettings::new(StorageSettings::memory("http://a.test/"));
        let handle = shared.clone();
        handle.update(StorageSettings::memory("http://b.test/"));
        assert_eq!(
            shared.storage_settings().unwrap().public_entry_url,
            "http://b.test/"
        );
    }

    #[test]
    fn test_arc_source() {
        let source: Arc<dyn SettingsSource> = Arc::new(StorageSettings::memory("http://a.test/"));
        assert_eq!(source.storage_settings().unwrap().bucket, "memory");
    }
}
