//! Picking a settings store backend by name.
//!
//! Binaries register the backends they link against, then open whichever
//! one the user asked for with a [`StoreConfig`].

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::repository::{SharedSettingsStore, StoreError};

/// Which settings backend to open, and how to reach it.
///
/// | backend  | connection_string                                   |
/// |----------|-----------------------------------------------------|
/// | `sqlite` | `sqlite:true-price.db?mode=rwc`, `sqlite::memory:`  |
/// | `memory` | unused                                              |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: String,
    /// Handed to the backend as is.
    pub connection_string: String,
}

/// Opens one kind of settings store.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Name users select this backend by, e.g. `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    /// Connects and prepares the store (migrations included).
    async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<SharedSettingsStore, StoreError>;
}

/// Backends known to this process.
#[derive(Default)]
pub struct StoreRegistry {
    factories: HashMap<&'static str, Box<dyn StoreFactory>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `factory`; a later factory with the same name wins.
    pub fn register(
        &mut self,
        factory: Box<dyn StoreFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the store named by `config.backend`.
    ///
    /// An unregistered name is a [`StoreError::Configuration`] listing the
    /// names that are registered.
    pub async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<SharedSettingsStore, StoreError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(StoreError::Configuration(format!(
                "unknown backend '{}'; available: {}",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        debug!(backend = %config.backend, "opening settings store");
        factory.create(config).await
    }
}
