//! Settings panel logic.
//!
//! Everything the settings surface decides on its own: which pages it may
//! talk to, how form input is validated, what gets persisted before the
//! page is told, and how page notifications update the panel. Rendering the
//! panel is left to whoever hosts it.

use std::fmt;

use price_core::calculations::common::{format_amount, format_rate};
use price_core::store::{SharedSettingsStore, load_configuration};
use price_core::{PriceBreakdown, PriceConfiguration, StoredSettings};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bridge::{BridgeClient, BridgeRequest, BridgeResponse, PageNotification};
use crate::overlay::{OverlayLine, SHIPPING_NOTE};

pub const SUPPORTED_ORIGIN: &str = "https://www.mac.bid/";
pub const SAVED_MESSAGE: &str = "Settings saved!";

/// Whether the panel may message a page at `url`: search results and lot pages only.
pub fn is_supported_page(url: &str) -> bool {
    if !url.starts_with(SUPPORTED_ORIGIN) {
        return false;
    }
    url.contains("/search") || url.contains("/lot/") || (url.contains('?') && url.contains("lid="))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Invalid input values. Please enter positive numbers.")]
    Invalid { field: &'static str },
}

/// Raw form fields as the user typed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub buyers_premium_rate: String,
    pub lot_fee: String,
    pub sales_tax_rate: String,
    pub show_price_overlay: bool,
}

impl SettingsForm {
    /// Prefills the form; every amount is shown with two decimals.
    pub fn from_configuration(config: &PriceConfiguration) -> Self {
        Self {
            buyers_premium_rate: format_amount(config.buyers_premium_rate),
            lot_fee: format_amount(config.lot_fee),
            sales_tax_rate: format_amount(config.sales_tax_rate),
            show_price_overlay: config.overlay_visible,
        }
    }

    pub fn parse(&self) -> Result<PriceConfiguration, FormError> {
        Ok(PriceConfiguration {
            buyers_premium_rate: parse_amount("buyersPremiumRate", &self.buyers_premium_rate)?,
            lot_fee: parse_amount("lotFee", &self.lot_fee)?,
            sales_tax_rate: parse_amount("salesTaxRate", &self.sales_tax_rate)?,
            overlay_visible: self.show_price_overlay,
        })
    }
}

/// Reads one numeric form field: trimmed, a decimal, not negative.
pub fn parse_amount(
    field: &'static str,
    raw: &str,
) -> Result<Decimal, FormError> {
    match raw.trim().parse::<Decimal>() {
        Ok(value) if value >= Decimal::ZERO => Ok(value),
        _ => Err(FormError::Invalid { field }),
    }
}

/// What the panel shows in its price section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceDetailsView {
    Details(Vec<OverlayLine>),
    /// The page answered with an error.
    PageError(String),
    /// The page could not be messaged at all.
    Unreachable(String),
    /// The page answered, but not with price details.
    NoData,
    NotSupported,
}

impl fmt::Display for PriceDetailsView {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Details(lines) => {
                for line in lines {
                    writeln!(f, "{line}")?;
                }
                Ok(())
            }
            Self::PageError(message) => write!(f, "Error from page: {message}"),
            Self::Unreachable(message) => write!(f, "Error contacting page: {message}"),
            Self::NoData => f.write_str(
                "No price data from page. Ensure you are on a Mac.bid lot page targeted by the extension.",
            ),
            Self::NotSupported => f.write_str("Not on an active Mac.bid page targeted by the extension."),
        }
    }
}

/// The panel's own, more compact rendering of a breakdown.
pub fn details_lines(breakdown: &PriceBreakdown) -> Vec<OverlayLine> {
    let line = |label: String, value: String| OverlayLine::Component { label, value };
    vec![
        line("Current Bid:".into(), format!("${}", format_amount(breakdown.winning_bid))),
        line(
            format!("Premium ({}%):", format_rate(breakdown.buyers_premium_rate_applied, 1)),
            format!("+${}", format_amount(breakdown.buyers_premium_amount)),
        ),
        line("Lot Fee:".into(), format!("+${}", format_amount(breakdown.lot_fee))),
        OverlayLine::Separator,
        line("Subtotal:".into(), format!("${}", format_amount(breakdown.subtotal_before_tax))),
        line(
            format!("Sales Tax ({}%):", format_rate(breakdown.sales_tax_rate_applied, 2)),
            format!("+${}", format_amount(breakdown.sales_tax_amount)),
        ),
        OverlayLine::Separator,
        OverlayLine::Total {
            label: "Total:".into(),
            value: format!("${}", format_amount(breakdown.true_price)),
        },
        OverlayLine::Note(SHIPPING_NOTE.to_string()),
    ]
}

/// The browser tab the panel was opened over.
#[derive(Debug, Clone)]
pub struct ActivePage {
    pub url: String,
    pub client: BridgeClient,
}

pub struct SettingsPanel {
    store: SharedSettingsStore,
    page: Option<ActivePage>,
    form: SettingsForm,
    status: Option<String>,
}

impl SettingsPanel {
    /// Opens the panel with the stored settings, or the defaults if the store cannot be read.
    pub async fn open(
        store: SharedSettingsStore,
        page: Option<ActivePage>,
    ) -> Self {
        let config = match load_configuration(store.as_ref()).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "settings store unavailable; showing defaults");
                PriceConfiguration::default()
            }
        };
        Self {
            store,
            page,
            form: SettingsForm::from_configuration(&config),
            status: None,
        }
    }

    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SettingsForm {
        &mut self.form
    }

    pub fn overlay_toggle(&self) -> bool {
        self.form.show_price_overlay
    }

    /// Last status line (saved, or the validation message).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn supported_page(&self) -> Option<&ActivePage> {
        self.page.as_ref().filter(|page| is_supported_page(&page.url))
    }

    async fn send(
        &self,
        request: BridgeRequest,
    ) {
        let Some(page) = self.supported_page() else {
            return;
        };
        if let Err(e) = page.client.request(request).await {
            debug!(error = %e, url = %page.url, "page did not take the update");
        }
    }

    /// Validates and persists the form, tells the page, then refetches the details.
    ///
    /// A store that cannot be written is logged; the page still gets the new settings.
    pub async fn save(&mut self) -> Result<PriceDetailsView, FormError> {
        let config = match self.form.parse() {
            Ok(config) => config,
            Err(e) => {
                self.status = Some(e.to_string());
                return Err(e);
            }
        };

        match self.store.save(&StoredSettings::from(&config)).await {
            Ok(()) => {
                info!("settings saved");
                self.status = Some(SAVED_MESSAGE.to_string());
            }
            Err(e) => {
                warn!(error = %e, "could not persist settings");
                self.status = None;
            }
        }

        self.send(BridgeRequest::SettingsUpdated {
            new_settings: config,
        })
        .await;
        Ok(self.refresh_price_details().await)
    }

    pub async fn toggle_visibility(
        &mut self,
        show: bool,
    ) {
        self.form.show_price_overlay = show;
        if let Err(e) = self.store.save(&StoredSettings::visibility(show)).await {
            warn!(error = %e, "could not persist overlay visibility");
        }
        self.send(BridgeRequest::VisibilityToggle { show }).await;
    }

    pub async fn refresh_price_details(&self) -> PriceDetailsView {
        let Some(page) = self.supported_page() else {
            return PriceDetailsView::NotSupported;
        };
        match page.client.request(BridgeRequest::GetPriceDetails).await {
            Ok(BridgeResponse::PriceDetails(breakdown)) => {
                PriceDetailsView::Details(details_lines(&breakdown))
            }
            Ok(BridgeResponse::Error { error }) => PriceDetailsView::PageError(error),
            Ok(BridgeResponse::Status { .. }) => PriceDetailsView::NoData,
            Err(e) => PriceDetailsView::Unreachable(e.to_string()),
        }
    }

    /// Applies a page notification. Returns fresh details when the page repriced.
    pub async fn handle_notification(
        &mut self,
        notification: PageNotification,
    ) -> Option<PriceDetailsView> {
        match notification {
            PageNotification::VisibilityStateChangedFromPage { visible } => {
                self.form.show_price_overlay = visible;
                None
            }
            PageNotification::PriceUpdatedOnPage => Some(self.refresh_price_details().await),
        }
    }
}
