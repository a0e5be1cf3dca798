//! The in-page overlay: a close button and a content area of text lines.
//!
//! Content is built from a [`PriceBreakdown`] as structured lines. A
//! [`PageAdapter`](crate::page::PageAdapter) turns those into whatever the
//! host page needs; nothing here produces markup.

use std::fmt;

use price_core::PriceBreakdown;
use price_core::calculations::common::{format_amount, format_rate};

pub const OVERLAY_ELEMENT_ID: &str = "macbid-true-price-extension-display";
pub const OVERLAY_CLASS: &str = "macbid-true-price-display";
pub const CLOSE_BUTTON_ID: &str = "macbid-price-overlay-close-btn-id";
pub const CLOSE_BUTTON_CLASS: &str = "macbid-price-overlay-close-btn";
pub const CLOSE_BUTTON_TITLE: &str = "Hide price overlay";
pub const CONTENT_CLASS: &str = "price-content-area";

/// Footnote shown under the total.
pub const SHIPPING_NOTE: &str = "(Excludes shipping)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseButton {
    pub id: &'static str,
    pub class: &'static str,
    pub label: &'static str,
    pub title: &'static str,
}

impl Default for CloseButton {
    fn default() -> Self {
        Self {
            id: CLOSE_BUTTON_ID,
            class: CLOSE_BUTTON_CLASS,
            label: "\u{00d7}",
            title: CLOSE_BUTTON_TITLE,
        }
    }
}

/// The overlay shell mounted once per page. Content is replaced in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub element_id: &'static str,
    pub class: &'static str,
    pub close_button: CloseButton,
    pub content_class: &'static str,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            element_id: OVERLAY_ELEMENT_ID,
            class: OVERLAY_CLASS,
            close_button: CloseButton::default(),
            content_class: CONTENT_CLASS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayLine {
    /// A labelled amount such as `Lot Fee: +$3.00`.
    Component { label: String, value: String },
    Separator,
    Total { label: String, value: String },
    Note(String),
}

impl fmt::Display for OverlayLine {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Component { label, value } | Self::Total { label, value } => {
                write!(f, "{label} {value}")
            }
            Self::Separator => f.write_str("----------------------"),
            Self::Note(note) => f.write_str(note),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayContent {
    lines: Vec<OverlayLine>,
}

impl OverlayContent {
    pub fn from_breakdown(breakdown: &PriceBreakdown) -> Self {
        let lines = vec![
            component("Current Bid:", format!("${}", format_amount(breakdown.winning_bid))),
            component(
                format!("Premium ({}%):", format_rate(breakdown.buyers_premium_rate_applied, 1)),
                format!("+${}", format_amount(breakdown.buyers_premium_amount)),
            ),
            component("Lot Fee:", format!("+${}", format_amount(breakdown.lot_fee))),
            OverlayLine::Separator,
            component(
                "Subtotal (tax base):",
                format!("${}", format_amount(breakdown.subtotal_before_tax)),
            ),
            component(
                format!("Sales Tax ({}%):", format_rate(breakdown.sales_tax_rate_applied, 2)),
                format!("+${}", format_amount(breakdown.sales_tax_amount)),
            ),
            OverlayLine::Total {
                label: "Estimated Total:".to_string(),
                value: format!("${}", format_amount(breakdown.true_price)),
            },
            OverlayLine::Note(SHIPPING_NOTE.to_string()),
        ];
        Self { lines }
    }

    pub fn lines(&self) -> &[OverlayLine] {
        &self.lines
    }

    /// The total line's value, e.g. `$126.26`.
    pub fn total(&self) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            OverlayLine::Total { value, .. } => Some(value.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for OverlayContent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn component(
    label: impl Into<String>,
    value: String,
) -> OverlayLine {
    OverlayLine::Component {
        label: label.into(),
        value,
    }
}
