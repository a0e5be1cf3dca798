//! True price calculation for an auction lot.
//!
//! The true price of a lot is what the winner actually pays, excluding
//! shipping:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Winning bid |
//! | 2    | Buyer's premium (Step 1 × premium rate / 100) |
//! | 3    | Lot fee (flat) |
//! | 4    | Subtotal before tax (Step 1 + Step 2 + Step 3) |
//! | 5    | Sales tax (Step 4 × tax rate / 100) |
//! | 6    | True price (Step 4 + Step 5) |
//!
//! Sales tax is charged on the premium and the lot fee as well as on the bid.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use price_core::{PriceConfiguration, PriceEngine};
//!
//! let config = PriceConfiguration::default(); // 15% premium, $3.00 fee, 7% tax
//! let engine = PriceEngine::new(&config);
//!
//! let breakdown = engine.compute(dec!(100.00)).unwrap();
//!
//! assert_eq!(breakdown.buyers_premium_amount, dec!(15.00));
//! assert_eq!(breakdown.subtotal_before_tax, dec!(118.00));
//! assert_eq!(breakdown.sales_tax_amount, dec!(8.26));
//! assert_eq!(breakdown.true_price, dec!(126.26));
//! ```

use rust_decimal::Decimal;

use crate::calculations::bid_text::parse_bid_text;
use crate::{PriceBreakdown, PriceConfiguration};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Calculator for the true price of a lot.
///
/// Borrows the configuration it prices with; build a new engine whenever the
/// configuration changes. Computation has no side effects.
#[derive(Debug, Clone, Copy)]
pub struct PriceEngine<'a> {
    config: &'a PriceConfiguration,
}

impl<'a> PriceEngine<'a> {
    pub fn new(config: &'a PriceConfiguration) -> Self {
        Self { config }
    }

    /// Computes the full breakdown for a winning bid.
    ///
    /// Returns `None` when an amount falls outside what `Decimal` can hold.
    pub fn compute(
        &self,
        winning_bid: Decimal,
    ) -> Option<PriceBreakdown> {
        let buyers_premium_amount =
            self.buyers_premium_amount(winning_bid, self.config.buyers_premium_rate)?;
        let subtotal_before_tax =
            self.subtotal_before_tax(winning_bid, buyers_premium_amount, self.config.lot_fee)?;
        let sales_tax_amount =
            self.sales_tax_amount(subtotal_before_tax, self.config.sales_tax_rate)?;
        let true_price = self.true_price(subtotal_before_tax, sales_tax_amount)?;

        Some(PriceBreakdown {
            winning_bid,
            buyers_premium_amount,
            lot_fee: self.config.lot_fee,
            buyers_premium_rate_applied: self.config.buyers_premium_rate,
            sales_tax_rate_applied: self.config.sales_tax_rate,
            subtotal_before_tax,
            sales_tax_amount,
            true_price,
        })
    }

    /// Parses scraped bid text and computes the breakdown.
    ///
    /// Returns `None` when the text holds no usable amount.
    pub fn compute_from_text(
        &self,
        bid_text: &str,
    ) -> Option<PriceBreakdown> {
        parse_bid_text(bid_text).and_then(|bid| self.compute(bid))
    }

    /// Calculates the buyer's premium on the bid.
    fn buyers_premium_amount(
        &self,
        winning_bid: Decimal,
        rate: Decimal,
    ) -> Option<Decimal> {
        winning_bid.checked_mul(rate)?.checked_div(ONE_HUNDRED)
    }

    /// Calculates the taxable subtotal.
    fn subtotal_before_tax(
        &self,
        winning_bid: Decimal,
        premium: Decimal,
        lot_fee: Decimal,
    ) -> Option<Decimal> {
        winning_bid.checked_add(premium)?.checked_add(lot_fee)
    }

    /// Calculates sales tax on the subtotal.
    fn sales_tax_amount(
        &self,
        subtotal: Decimal,
        rate: Decimal,
    ) -> Option<Decimal> {
        subtotal.checked_mul(rate)?.checked_div(ONE_HUNDRED)
    }

    fn true_price(
        &self,
        subtotal: Decimal,
        sales_tax: Decimal,
    ) -> Option<Decimal> {
        subtotal.checked_add(sales_tax)
    }
}
