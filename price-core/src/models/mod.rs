mod price_breakdown;
mod price_configuration;
mod stored_settings;

pub use price_breakdown::PriceBreakdown;
pub use price_configuration::{
    ConfigurationError, DEFAULT_BUYERS_PREMIUM_RATE, DEFAULT_LOT_FEE, DEFAULT_SALES_TAX_RATE,
    DEFAULT_SHOW_PRICE_OVERLAY, PriceConfiguration,
};
pub use stored_settings::{SettingKey, StoredSettings};
