use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PriceConfiguration, StoredSettings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Settings store unavailable")]
    Unavailable,
}

/// Key/value persistence for the price settings.
///
/// Both the page synchronizer (reads, and the close button's visibility
/// write) and the settings surface (writes) go through this trait.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns every persisted key. Keys that were never written are `None`.
    async fn load(&self) -> Result<StoredSettings, StoreError>;

    /// Writes the keys present in `settings`, leaving the others untouched.
    async fn save(
        &self,
        settings: &StoredSettings,
    ) -> Result<(), StoreError>;
}

pub type SharedSettingsStore = Arc<dyn SettingsStore>;

/// Loads the full configuration, defaulting any absent key.
pub async fn load_configuration(
    store: &dyn SettingsStore
) -> Result<PriceConfiguration, StoreError> {
    Ok(store.load().await?.into_configuration())
}
