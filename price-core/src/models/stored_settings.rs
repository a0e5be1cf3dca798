use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PriceConfiguration;

/// Keys of the persisted settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    BuyersPremiumRate,
    LotFee,
    SalesTaxRate,
    ShowPriceOverlay,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        Self::BuyersPremiumRate,
        Self::LotFee,
        Self::SalesTaxRate,
        Self::ShowPriceOverlay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyersPremiumRate => "buyersPremiumRate",
            Self::LotFee => "lotFee",
            Self::SalesTaxRate => "salesTaxRate",
            Self::ShowPriceOverlay => "showPriceOverlay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == s)
    }
}

/// A partial settings record as held by a key/value store.
///
/// Any key may be absent; absent keys fall back to the defaults of
/// [`PriceConfiguration`]. Saving a record only writes the keys it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyers_premium_rate: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_fee: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_tax_rate: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_price_overlay: Option<bool>,
}

impl StoredSettings {
    /// A write touching only the overlay visibility key.
    pub fn visibility(visible: bool) -> Self {
        Self {
            show_price_overlay: Some(visible),
            ..Default::default()
        }
    }

    /// Overlays every key present in `other` onto `self`.
    pub fn merge(&mut self, other: &StoredSettings) {
        if other.buyers_premium_rate.is_some() {
            self.buyers_premium_rate = other.buyers_premium_rate;
        }
        if other.lot_fee.is_some() {
            self.lot_fee = other.lot_fee;
        }
        if other.sales_tax_rate.is_some() {
            self.sales_tax_rate = other.sales_tax_rate;
        }
        if other.show_price_overlay.is_some() {
            self.show_price_overlay = other.show_price_overlay;
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Resolves the record into a full configuration, defaulting absent keys.
    pub fn into_configuration(self) -> PriceConfiguration {
        let defaults = PriceConfiguration::default();
        PriceConfiguration {
            buyers_premium_rate: self
                .buyers_premium_rate
                .unwrap_or(defaults.buyers_premium_rate),
            lot_fee: self.lot_fee.unwrap_or(defaults.lot_fee),
            sales_tax_rate: self.sales_tax_rate.unwrap_or(defaults.sales_tax_rate),
            overlay_visible: self
                .show_price_overlay
                .unwrap_or(defaults.overlay_visible),
        }
    }
}

impl From<&PriceConfiguration> for StoredSettings {
    fn from(config: &PriceConfiguration) -> Self {
        Self {
            buyers_premium_rate: Some(config.buyers_premium_rate),
            lot_fee: Some(config.lot_fee),
            sales_tax_rate: Some(config.sales_tax_rate),
            show_price_overlay: Some(config.overlay_visible),
        }
    }
}
