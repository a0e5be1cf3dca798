use std::sync::Arc;

use async_trait::async_trait;

use price_core::store::{SharedSettingsStore, StoreConfig, StoreError, StoreFactory};

use crate::store::SqliteSettingsStore;

/// [`StoreFactory`] for SQLite.
///
/// Register this with a [`price_core::store::StoreRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use price_core::store::StoreRegistry;
/// use price_db_sqlite::SqliteStoreFactory;
///
/// let mut registry = StoreRegistry::new();
/// registry.register(Box::new(SqliteStoreFactory));
/// ```
pub struct SqliteStoreFactory;

#[async_trait]
impl StoreFactory for SqliteStoreFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and run
    /// migrations.
    ///
    /// The connection string is a sqlx URL: `sqlite:true-price.db?mode=rwc`
    /// creates the file when missing, `sqlite::memory:` is ephemeral.
    async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<SharedSettingsStore, StoreError> {
        let store = SqliteSettingsStore::new(&config.connection_string)
            .await
            .map_err(|e| StoreError::Connection(format!("{e:#}")))?;
        store
            .run_migrations()
            .await
            .map_err(|e| StoreError::Database(format!("{e:#}")))?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use price_core::store::{StoreConfig, StoreFactory};

    use super::SqliteStoreFactory;

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteStoreFactory.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn creates_in_memory_store() {
        let config = StoreConfig {
            backend: "sqlite".to_string(),
            connection_string: "sqlite::memory:".to_string(),
        };

        let result = SqliteStoreFactory.create(&config).await;
        assert!(
            result.is_ok(),
            "failed to create in-memory store: {:#?}",
            result.err()
        );
    }

    #[tokio::test]
    async fn unreachable_path_is_connection_error() {
        let config = StoreConfig {
            backend: "sqlite".to_string(),
            connection_string: "sqlite:/nonexistent-dir/settings.db".to_string(),
        };

        let result = SqliteStoreFactory.create(&config).await;
        assert!(matches!(
            result,
            Err(price_core::StoreError::Connection(_))
        ));
    }
}
