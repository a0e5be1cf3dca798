pub mod calculations;
pub mod models;
pub mod store;

pub use calculations::{PriceEngine, parse_bid_text};
pub use models::*;
pub use store::{SettingsStore, StoreError};
