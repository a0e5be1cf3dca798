use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Buyer's premium applied when nothing is stored (15%).
pub const DEFAULT_BUYERS_PREMIUM_RATE: Decimal = Decimal::from_parts(150, 0, 0, false, 1);
/// Flat per-lot fee applied when nothing is stored ($3.00).
pub const DEFAULT_LOT_FEE: Decimal = Decimal::from_parts(300, 0, 0, false, 2);
/// Sales tax applied when nothing is stored (7%).
pub const DEFAULT_SALES_TAX_RATE: Decimal = Decimal::from_parts(70, 0, 0, false, 1);
pub const DEFAULT_SHOW_PRICE_OVERLAY: bool = true;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: Decimal },
}

/// Rates and fees used to derive the true price of a lot.
///
/// Rates are percentages (`15` means 15%). Field names on the wire and in
/// the settings store match the keys the settings surface writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceConfiguration {
    #[serde(rename = "buyersPremiumRate")]
    pub buyers_premium_rate: Decimal,

    #[serde(rename = "lotFee")]
    pub lot_fee: Decimal,

    #[serde(rename = "salesTaxRate")]
    pub sales_tax_rate: Decimal,

    /// Whether the on-page overlay should be shown.
    #[serde(rename = "showPriceOverlay")]
    pub overlay_visible: bool,
}

impl Default for PriceConfiguration {
    fn default() -> Self {
        Self {
            buyers_premium_rate: DEFAULT_BUYERS_PREMIUM_RATE,
            lot_fee: DEFAULT_LOT_FEE,
            sales_tax_rate: DEFAULT_SALES_TAX_RATE,
            overlay_visible: DEFAULT_SHOW_PRICE_OVERLAY,
        }
    }
}

impl PriceConfiguration {
    /// Checks that no rate or fee is negative.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("buyersPremiumRate", self.buyers_premium_rate),
            ("lotFee", self.lot_fee),
            ("salesTaxRate", self.sales_tax_rate),
        ] {
            if value < Decimal::ZERO {
                return Err(ConfigurationError::Negative { field, value });
            }
        }
        Ok(())
    }

    /// Returns a copy with the overlay visibility replaced.
    pub fn with_visibility(&self, visible: bool) -> Self {
        Self {
            overlay_visible: visible,
            ..self.clone()
        }
    }
}
