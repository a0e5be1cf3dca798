use anyhow::{Context, Result};
use async_trait::async_trait;
use price_core::{SettingKey, SettingsStore, StoreError, StoredSettings};
use rust_decimal::Decimal;
use sqlx::{Row, sqlite::SqlitePool};
use tracing::{debug, warn};

pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parses a stored decimal, treating an unreadable value as absent.
fn parse_stored_decimal(
    key: SettingKey,
    value: &str,
) -> Option<Decimal> {
    match value.trim().parse::<Decimal>() {
        Ok(d) => Some(d),
        Err(e) => {
            warn!(key = key.as_str(), value, "ignoring unreadable stored setting: {}", e);
            None
        }
    }
}

fn parse_stored_bool(
    key: SettingKey,
    value: &str,
) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        other => {
            warn!(key = key.as_str(), value = other, "ignoring unreadable stored setting");
            None
        }
    }
}

/// The `(key, value)` pairs a partial record writes.
fn stored_entries(settings: &StoredSettings) -> Vec<(SettingKey, String)> {
    let mut entries = Vec::new();
    if let Some(rate) = settings.buyers_premium_rate {
        entries.push((SettingKey::BuyersPremiumRate, rate.to_string()));
    }
    if let Some(fee) = settings.lot_fee {
        entries.push((SettingKey::LotFee, fee.to_string()));
    }
    if let Some(rate) = settings.sales_tax_rate {
        entries.push((SettingKey::SalesTaxRate, rate.to_string()));
    }
    if let Some(visible) = settings.show_price_overlay {
        entries.push((SettingKey::ShowPriceOverlay, visible.to_string()));
    }
    entries
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self) -> Result<StoredSettings, StoreError> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut settings = StoredSettings::default();
        for row in rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| StoreError::Database(e.to_string()))?;
            let value: String = row
                .try_get("value")
                .map_err(|e| StoreError::Database(e.to_string()))?;

            match SettingKey::parse(&key) {
                Some(k @ SettingKey::BuyersPremiumRate) => {
                    settings.buyers_premium_rate = parse_stored_decimal(k, &value)
                }
                Some(k @ SettingKey::LotFee) => settings.lot_fee = parse_stored_decimal(k, &value),
                Some(k @ SettingKey::SalesTaxRate) => {
                    settings.sales_tax_rate = parse_stored_decimal(k, &value)
                }
                Some(k @ SettingKey::ShowPriceOverlay) => {
                    settings.show_price_overlay = parse_stored_bool(k, &value)
                }
                None => debug!(key = %key, "skipping unknown settings key"),
            }
        }

        Ok(settings)
    }

    async fn save(
        &self,
        settings: &StoredSettings,
    ) -> Result<(), StoreError> {
        let entries = stored_entries(settings);
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key.as_str())
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}
