use anyhow::{Context, Result};
use price_core::store::{
    InMemoryStoreFactory, SharedSettingsStore, StoreConfig, StoreRegistry, load_configuration,
};
use price_core::{PriceBreakdown, PriceConfiguration, PriceEngine, StoredSettings};
use price_db_sqlite::SqliteStoreFactory;
use price_sync::OverlayContent;
use price_sync::panel::parse_amount;
use rust_decimal::Decimal;
use tracing::debug;

/// Registry with every store backend this binary ships.
pub fn build_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();
    registry.register(Box::new(SqliteStoreFactory));
    registry.register(Box::new(InMemoryStoreFactory));
    registry
}

pub async fn open_store(config: &StoreConfig) -> Result<SharedSettingsStore> {
    build_registry()
        .create(config)
        .await
        .with_context(|| format!("cannot open '{}' settings store", config.backend))
}

/// One-off rate overrides for a quote. Unset fields use the stored settings.
#[derive(Debug, Clone, Default)]
pub struct QuoteOverrides {
    pub buyers_premium_rate: Option<Decimal>,
    pub lot_fee: Option<Decimal>,
    pub sales_tax_rate: Option<Decimal>,
}

/// Prices `bid_text` with the stored configuration plus `overrides`.
///
/// Returns `None` when the text holds no readable bid or the amounts
/// are too large to price.
pub async fn quote(
    store: &SharedSettingsStore,
    bid_text: &str,
    overrides: &QuoteOverrides,
) -> Result<Option<PriceBreakdown>> {
    let stored = load_configuration(store.as_ref())
        .await
        .context("cannot read stored settings")?;
    let config = PriceConfiguration {
        buyers_premium_rate: overrides
            .buyers_premium_rate
            .unwrap_or(stored.buyers_premium_rate),
        lot_fee: overrides.lot_fee.unwrap_or(stored.lot_fee),
        sales_tax_rate: overrides.sales_tax_rate.unwrap_or(stored.sales_tax_rate),
        ..stored
    };
    config.validate()?;
    Ok(PriceEngine::new(&config).compute_from_text(bid_text))
}

/// Renders a quote the way the overlay shows it.
pub fn format_quote(breakdown: &PriceBreakdown) -> String {
    OverlayContent::from_breakdown(breakdown).to_string()
}

pub async fn show_settings(store: &SharedSettingsStore) -> Result<PriceConfiguration> {
    load_configuration(store.as_ref())
        .await
        .context("cannot read stored settings")
}

/// Raw values for `settings set`; unset fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub buyers_premium_rate: Option<String>,
    pub lot_fee: Option<String>,
    pub sales_tax_rate: Option<String>,
    pub show_price_overlay: Option<bool>,
}

/// Validates `update` and writes only the keys it sets.
///
/// Amounts follow the settings panel's input rules.
pub async fn update_settings(
    store: &SharedSettingsStore,
    update: SettingsUpdate,
) -> Result<PriceConfiguration> {
    let amount = |field: &'static str, raw: Option<String>| {
        raw.map(|raw| parse_amount(field, &raw)).transpose()
    };
    let write = StoredSettings {
        buyers_premium_rate: amount("buyersPremiumRate", update.buyers_premium_rate)?,
        lot_fee: amount("lotFee", update.lot_fee)?,
        sales_tax_rate: amount("salesTaxRate", update.sales_tax_rate)?,
        show_price_overlay: update.show_price_overlay,
    };

    if write.is_empty() {
        debug!("no settings given; nothing to write");
    } else {
        store.save(&write).await.context("cannot save settings")?;
    }
    show_settings(store).await
}
