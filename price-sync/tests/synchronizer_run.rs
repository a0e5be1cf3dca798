use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use price_core::store::InMemorySettingsStore;
use price_core::{PriceConfiguration, SettingsStore, StoredSettings};
use price_sync::bridge::{self, BridgeClient, PageNotification};
use price_sync::panel::{ActivePage, PriceDetailsView, SettingsPanel};
use price_sync::{BridgeRequest, BridgeResponse, InMemoryPage, PageEvent, PageSynchronizer};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

const LOT_1: &str = "https://www.mac.bid/lot/1001";
const LOT_2: &str = "https://www.mac.bid/lot/1002";

struct Harness {
    page: InMemoryPage,
    store: Arc<InMemorySettingsStore>,
    events: mpsc::Sender<PageEvent>,
    client: BridgeClient,
    notes: mpsc::UnboundedReceiver<PageNotification>,
    task: JoinHandle<PageSynchronizer<InMemoryPage>>,
}

impl Harness {
    fn spawn(page: InMemoryPage) -> Self {
        Self::spawn_with_store(page, InMemorySettingsStore::new_shared())
    }

    fn spawn_with_store(
        page: InMemoryPage,
        store: Arc<InMemorySettingsStore>,
    ) -> Self {
        let (notifier, notes) = bridge::notifications();
        let (events, events_rx) = mpsc::channel(32);
        let (client, requests) = bridge::channel();
        let sync = PageSynchronizer::new(
            page.clone(),
            PriceConfiguration::default(),
            store.clone(),
            notifier,
        );
        let task = tokio::spawn(sync.run(events_rx, requests));
        Self {
            page,
            store,
            events,
            client,
            notes,
            task,
        }
    }

    async fn send(
        &self,
        event: PageEvent,
    ) {
        self.events.send(event).await.unwrap();
    }

    fn drain_notes(&mut self) -> Vec<PageNotification> {
        let mut seen = Vec::new();
        while let Ok(note) = self.notes.try_recv() {
            seen.push(note);
        }
        seen
    }

    async fn shutdown(self) -> PageSynchronizer<InMemoryPage> {
        drop(self.events);
        drop(self.client);
        self.task.await.unwrap()
    }
}

#[tokio::test(start_paused = true)]
async fn initial_render_after_startup_delay() {
    let mut h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$100.00"));

    sleep(Duration::from_millis(50)).await;
    assert!(h.page.overlay().is_none());

    sleep(Duration::from_millis(100)).await;
    assert_eq!(h.drain_notes(), vec![PageNotification::PriceUpdatedOnPage]);
    assert!(
        h.page
            .overlay_text()
            .unwrap()
            .contains("Estimated Total: $126.26")
    );

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn navigation_then_new_bid_reprices_exactly_once() {
    let mut h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$10.00"));
    sleep(Duration::from_millis(150)).await;
    h.drain_notes();

    h.send(PageEvent::Mutation(h.page.navigate(LOT_2))).await;
    for bid in ["$20.00", "$21.00", "$22.00"] {
        sleep(Duration::from_millis(40)).await;
        h.send(PageEvent::Mutation(h.page.set_bid_text(Some(bid)))).await;
    }
    assert!(h.page.overlay().is_none());

    sleep(Duration::from_millis(600)).await;

    assert_eq!(h.drain_notes(), vec![PageNotification::PriceUpdatedOnPage]);
    let sync = h.shutdown().await;
    assert_eq!(sync.last_known_bid(), Some(dec!(22.00)));
}

#[tokio::test(start_paused = true)]
async fn redraw_with_same_bid_is_idempotent() {
    let mut h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$50.00"));
    sleep(Duration::from_millis(150)).await;
    let writes = h.page.content_writes();

    h.send(PageEvent::Mutation(h.page.set_bid_text(Some("$50.00")))).await;
    sleep(Duration::from_millis(400)).await;

    assert_eq!(h.page.content_writes(), writes);
    assert_eq!(h.page.mounts(), 1);
    assert_eq!(h.drain_notes(), vec![PageNotification::PriceUpdatedOnPage]);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn toggle_off_and_on_over_bridge() {
    let h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$100.00"));
    sleep(Duration::from_millis(150)).await;
    let shown = h.page.overlay_text();

    h.client
        .request(BridgeRequest::VisibilityToggle { show: false })
        .await
        .unwrap();
    assert!(h.page.overlay().is_none());

    h.client
        .request(BridgeRequest::VisibilityToggle { show: true })
        .await
        .unwrap();
    assert_eq!(h.page.overlay_text(), shown);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn price_details_as_json() {
    let h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$100.00"));
    sleep(Duration::from_millis(150)).await;

    let reply = h
        .client
        .request_json(r#"{"type":"GET_PRICE_DETAILS"}"#)
        .await
        .unwrap();
    let response: BridgeResponse = serde_json::from_str(&reply).unwrap();

    let BridgeResponse::PriceDetails(breakdown) = response else {
        panic!("expected price details, got {reply}");
    };
    assert_eq!(breakdown.true_price, dec!(126.26));

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn close_button_hides_and_persists() {
    let mut h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$100.00"));
    sleep(Duration::from_millis(150)).await;
    h.drain_notes();

    h.send(PageEvent::CloseClicked).await;
    sleep(Duration::from_millis(10)).await;

    assert!(h.page.overlay().is_none());
    assert_eq!(
        h.drain_notes(),
        vec![PageNotification::VisibilityStateChangedFromPage { visible: false }]
    );
    assert_eq!(
        h.store.load().await.unwrap().show_price_overlay,
        Some(false)
    );

    // A later focus reload reads the persisted hidden state.
    h.send(PageEvent::Focus).await;
    sleep(Duration::from_millis(300)).await;
    assert!(h.page.overlay().is_none());

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn panel_update_wins_over_pending_focus_reload() {
    let store = InMemorySettingsStore::new_shared();
    let h = Harness::spawn_with_store(InMemoryPage::new(LOT_1).with_bid("$100.00"), store.clone());
    sleep(Duration::from_millis(150)).await;

    // Something else writes the store, then the window regains focus.
    store
        .save(&StoredSettings {
            lot_fee: Some(dec!(5.00)),
            ..Default::default()
        })
        .await
        .unwrap();
    h.send(PageEvent::Focus).await;
    sleep(Duration::from_millis(100)).await;

    h.client
        .request(BridgeRequest::SettingsUpdated {
            new_settings: PriceConfiguration {
                lot_fee: dec!(7.00),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    sleep(Duration::from_millis(500)).await;

    assert!(h.page.overlay_text().unwrap().contains("Lot Fee: +$7.00"));
    let sync = h.shutdown().await;
    assert_eq!(sync.config().lot_fee, dec!(7.00));
}

#[tokio::test(start_paused = true)]
async fn panel_save_reaches_running_page() {
    let h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$100.00"));
    sleep(Duration::from_millis(150)).await;
    let active = ActivePage {
        url: LOT_1.to_string(),
        client: h.client.clone(),
    };
    let mut panel = SettingsPanel::open(h.store.clone(), Some(active)).await;

    panel.form_mut().sales_tax_rate = "0".to_string();
    let view = panel.save().await.unwrap();

    assert!(h.page.overlay_text().unwrap().contains("Estimated Total: $118.00"));
    let PriceDetailsView::Details(_) = &view else {
        panic!("expected details, got {view:?}");
    };
    assert!(view.to_string().contains("Total: $118.00"));

    drop(panel);
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_page_is_unreachable_for_panel() {
    let h = Harness::spawn(InMemoryPage::new(LOT_1).with_bid("$1.00"));
    sleep(Duration::from_millis(150)).await;
    h.task.abort();
    assert!(h.task.await.err().is_some_and(|e| e.is_cancelled()));

    let active = ActivePage {
        url: LOT_1.to_string(),
        client: h.client,
    };
    let panel = SettingsPanel::open(h.store, Some(active)).await;

    assert_eq!(
        panel.refresh_price_details().await,
        PriceDetailsView::Unreachable("page is not reachable".to_string())
    );
}
