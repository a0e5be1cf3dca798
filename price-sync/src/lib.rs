//! Keeps a "true price" overlay in step with a live auction page.
//!
//! [`PageSynchronizer`] owns the overlay and reacts to page events, stored
//! settings and bridge requests. [`SettingsPanel`] is the other end of the
//! bridge.

pub mod bridge;
pub mod debounce;
pub mod overlay;
pub mod page;
pub mod panel;
pub mod synchronizer;

pub use bridge::{
    BridgeClient, BridgeError, BridgeRequest, BridgeRequests, BridgeResponse, NotificationSender,
    PageNotification,
};
pub use debounce::{Debouncer, TriggerClass};
pub use overlay::{Overlay, OverlayContent, OverlayLine};
pub use page::{InMemoryPage, PageAdapter, PageEvent};
pub use panel::{ActivePage, FormError, PriceDetailsView, SettingsForm, SettingsPanel};
pub use synchronizer::{PageSynchronizer, RenderOutcome, SyncTimings};
