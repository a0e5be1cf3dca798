use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::factory::{StoreConfig, StoreFactory};
use super::repository::{SettingsStore, SharedSettingsStore, StoreError};
use crate::models::StoredSettings;

/// Fake in-memory settings store.
///
/// Useful for unit-tests and for running without a database. It can be
/// switched into an unavailable state to exercise the fallback paths.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: RwLock<StoredSettings>,
    unavailable: AtomicBool,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: StoredSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<StoredSettings, StoreError> {
        self.ensure_available()?;
        self.settings
            .read()
            .map(|settings| settings.clone())
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn save(
        &self,
        settings: &StoredSettings,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.settings
            .write()
            .map(|mut stored| stored.merge(settings))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

/// [`StoreFactory`] for the `"memory"` backend. The connection string is ignored.
pub struct InMemoryStoreFactory;

#[async_trait]
impl StoreFactory for InMemoryStoreFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &StoreConfig,
    ) -> Result<SharedSettingsStore, StoreError> {
        Ok(Arc::new(InMemorySettingsStore::new()))
    }
}
