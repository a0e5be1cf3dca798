//! Parsing of bid amounts scraped from page text.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Leading numeric literal of an already-cleaned bid string.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").expect("static pattern is valid"));

/// Removes everything but ASCII digits, `.` and `-`.
fn clean_bid_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Parses a winning bid from the text of the bid element.
///
/// Currency symbols, thousands separators and whitespace are dropped, then
/// the longest leading number is read, so trailing noise such as a second
/// amount does not make the whole text unusable. Returns `None` when no
/// number can be read ("no active bid").
///
/// ```
/// use rust_decimal_macros::dec;
/// use price_core::parse_bid_text;
///
/// assert_eq!(parse_bid_text("$1,234.56"), Some(dec!(1234.56)));
/// assert_eq!(parse_bid_text("N/A"), None);
/// assert_eq!(parse_bid_text(""), None);
/// ```
pub fn parse_bid_text(text: &str) -> Option<Decimal> {
    let cleaned = clean_bid_text(text);
    let literal = LEADING_NUMBER.find(&cleaned)?.as_str();

    let (sign, digits) = match literal.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", literal),
    };
    let digits = digits.trim_end_matches('.');
    let normalized = if digits.starts_with('.') {
        format!("{sign}0{digits}")
    } else {
        format!("{sign}{digits}")
    };

    match normalized.parse::<Decimal>() {
        Ok(bid) => Some(bid),
        Err(e) => {
            tracing::debug!(input = %text, "bid text is not a representable amount: {}", e);
            None
        }
    }
}
