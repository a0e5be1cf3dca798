use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Itemized true price of a lot for one winning bid.
///
/// Produced by [`crate::PriceEngine`]. Amounts keep full precision; round
/// with [`crate::calculations::common::format_amount`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub winning_bid: Decimal,
    pub buyers_premium_amount: Decimal,
    pub lot_fee: Decimal,
    pub buyers_premium_rate_applied: Decimal,
    pub sales_tax_rate_applied: Decimal,
    pub subtotal_before_tax: Decimal,
    pub sales_tax_amount: Decimal,
    pub true_price: Decimal,
}
