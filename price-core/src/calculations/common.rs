//! Common helpers for price display.
//!
//! Breakdown amounts are kept at full precision; these helpers round them
//! only when they are turned into text.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use price_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(8.255)), dec!(8.26));
/// assert_eq!(round_half_up(dec!(8.254)), dec!(8.25));
/// assert_eq!(round_half_up(dec!(-8.255)), dec!(-8.26)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    round_to(value, 2)
}

fn round_to(
    value: Decimal,
    decimal_places: u32,
) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimal_places);
    rounded
}

/// Formats a currency amount with exactly two decimal places.
///
/// ```
/// use rust_decimal_macros::dec;
/// use price_core::calculations::common::format_amount;
///
/// assert_eq!(format_amount(dec!(3)), "3.00");
/// assert_eq!(format_amount(dec!(126.2600)), "126.26");
/// ```
pub fn format_amount(value: Decimal) -> String {
    round_half_up(value).to_string()
}

/// Formats a percentage rate with a fixed number of decimal places.
pub fn format_rate(
    rate: Decimal,
    decimal_places: u32,
) -> String {
    round_to(rate, decimal_places).to_string()
}
