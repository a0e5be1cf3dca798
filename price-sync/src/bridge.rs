//! Settings Bridge: messages between the settings panel and the page.
//!
//! Requests travel from the panel to the page over an mpsc channel and carry
//! a oneshot slot for the reply. Notifications travel the other way without
//! a reply. Either side may be gone at any time; that is never an error for
//! the sender beyond [`BridgeError::Unreachable`].

use price_core::{PriceBreakdown, PriceConfiguration};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

pub const STATUS_SETTINGS_UPDATED: &str = "Content script: Settings updated and display refreshed.";
pub const STATUS_VISIBILITY_TOGGLED: &str = "Content script: Visibility toggled.";
pub const ERROR_NO_PRICE_DETAILS: &str = "Content script: Could not calculate price details.";

const REQUEST_BUFFER: usize = 16;

/// Panel to page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeRequest {
    SettingsUpdated {
        #[serde(rename = "newSettings")]
        new_settings: PriceConfiguration,
    },
    VisibilityToggle {
        show: bool,
    },
    GetPriceDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeResponse {
    Status { status: String },
    PriceDetails(PriceBreakdown),
    Error { error: String },
}

impl BridgeResponse {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            status: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

/// Page to panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageNotification {
    VisibilityStateChangedFromPage { visible: bool },
    PriceUpdatedOnPage,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("page is not reachable")]
    Unreachable,

    #[error("page closed the request without answering")]
    Closed,

    #[error("malformed bridge message: {0}")]
    Malformed(String),
}

/// A request waiting for its reply.
#[derive(Debug)]
pub struct Envelope {
    pub request: BridgeRequest,
    pub reply: Reply,
}

#[derive(Debug)]
pub struct Reply(oneshot::Sender<BridgeResponse>);

impl Reply {
    pub fn send(
        self,
        response: BridgeResponse,
    ) {
        if self.0.send(response).is_err() {
            trace!("requester went away before the response was ready");
        }
    }
}

/// Receiving half held by the page side.
pub type BridgeRequests = mpsc::Receiver<Envelope>;

#[derive(Debug, Clone)]
pub struct BridgeClient {
    tx: mpsc::Sender<Envelope>,
}

impl BridgeClient {
    pub async fn request(
        &self,
        request: BridgeRequest,
    ) -> Result<BridgeResponse, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: Reply(reply),
            })
            .await
            .map_err(|_| BridgeError::Unreachable)?;
        response.await.map_err(|_| BridgeError::Closed)
    }

    /// Sends a request given as JSON and returns the JSON reply.
    pub async fn request_json(
        &self,
        message: &str,
    ) -> Result<String, BridgeError> {
        let request: BridgeRequest =
            serde_json::from_str(message).map_err(|e| BridgeError::Malformed(e.to_string()))?;
        let response = self.request(request).await?;
        serde_json::to_string(&response).map_err(|e| BridgeError::Malformed(e.to_string()))
    }
}

pub fn channel() -> (BridgeClient, BridgeRequests) {
    let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
    (BridgeClient { tx }, rx)
}

#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<PageNotification>,
}

impl NotificationSender {
    /// Fire and forget. A panel that is not open simply misses the message.
    pub fn notify(
        &self,
        notification: PageNotification,
    ) {
        if self.tx.send(notification).is_err() {
            trace!("no settings panel listening; notification dropped");
        }
    }
}

pub fn notifications() -> (NotificationSender, mpsc::UnboundedReceiver<PageNotification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn request_wire_names() {
        let toggle = serde_json::to_value(BridgeRequest::VisibilityToggle { show: false }).unwrap();
        let details = serde_json::to_value(BridgeRequest::GetPriceDetails).unwrap();

        assert_eq!(toggle, json!({ "type": "VISIBILITY_TOGGLE", "show": false }));
        assert_eq!(details, json!({ "type": "GET_PRICE_DETAILS" }));
    }

    #[test]
    fn settings_update_parses_numeric_payload() {
        let message = json!({
            "type": "SETTINGS_UPDATED",
            "newSettings": {
                "buyersPremiumRate": 12.5,
                "lotFee": 2,
                "salesTaxRate": 8.25,
                "showPriceOverlay": true
            }
        });

        let request: BridgeRequest = serde_json::from_value(message).unwrap();

        let BridgeRequest::SettingsUpdated { new_settings } = request else {
            panic!("expected SETTINGS_UPDATED, got {request:?}");
        };
        assert_eq!(new_settings.buyers_premium_rate, dec!(12.5));
        assert_eq!(new_settings.lot_fee, dec!(2));
        assert!(new_settings.overlay_visible);
    }

    #[test]
    fn notification_wire_names() {
        let closed = PageNotification::VisibilityStateChangedFromPage { visible: false };

        assert_eq!(
            serde_json::to_value(closed).unwrap(),
            json!({ "type": "VISIBILITY_STATE_CHANGED_FROM_PAGE", "visible": false })
        );
        assert_eq!(
            serde_json::to_value(PageNotification::PriceUpdatedOnPage).unwrap(),
            json!({ "type": "PRICE_UPDATED_ON_PAGE" })
        );
    }

    #[test]
    fn untagged_responses_parse_by_shape() {
        let status: BridgeResponse = serde_json::from_value(json!({ "status": "ok" })).unwrap();
        let error: BridgeResponse = serde_json::from_value(json!({ "error": "nope" })).unwrap();

        assert_eq!(status, BridgeResponse::status("ok"));
        assert_eq!(error, BridgeResponse::error("nope"));
    }

    #[tokio::test]
    async fn request_gets_reply_through_envelope() {
        let (client, mut requests) = channel();
        let page = tokio::spawn(async move {
            let envelope = requests.recv().await.unwrap();
            assert_eq!(envelope.request, BridgeRequest::GetPriceDetails);
            envelope.reply.send(BridgeResponse::error(ERROR_NO_PRICE_DETAILS));
        });

        let response = client.request(BridgeRequest::GetPriceDetails).await;

        assert_eq!(response, Ok(BridgeResponse::error(ERROR_NO_PRICE_DETAILS)));
        page.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_page_is_unreachable() {
        let (client, requests) = channel();
        drop(requests);

        let response = client.request(BridgeRequest::VisibilityToggle { show: true }).await;

        assert_eq!(response, Err(BridgeError::Unreachable));
    }

    #[tokio::test]
    async fn dropped_envelope_is_closed() {
        let (client, mut requests) = channel();
        let page = tokio::spawn(async move {
            drop(requests.recv().await);
        });

        let response = client.request(BridgeRequest::GetPriceDetails).await;

        assert_eq!(response, Err(BridgeError::Closed));
        page.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_before_sending() {
        let (client, _requests) = channel();

        let result = client.request_json(r#"{"type":"SHIP_IT"}"#).await;

        assert!(matches!(result, Err(BridgeError::Malformed(_))));
    }

    #[test]
    fn notify_without_listener_is_silent() {
        let (sender, receiver) = notifications();
        drop(receiver);

        sender.notify(PageNotification::PriceUpdatedOnPage);
    }
}
