//! Page Synchronizer.
//!
//! Keeps the overlay in step with the bid shown on the page, the stored
//! settings and requests arriving over the bridge. All state lives in one
//! [`PageSynchronizer`] driven by a single task: page events, bridge
//! requests and debounce deadlines are handled one at a time, so nothing
//! else ever touches the overlay or the last rendered bid.
//!
//! | trigger                 | timer        | action                        |
//! |-------------------------|--------------|-------------------------------|
//! | start                   | initial      | load settings, render, observe|
//! | bid mutation            | mutation     | render if the bid changed     |
//! | URL change / popstate   | navigation   | load settings, render         |
//! | window focus            | focus        | load settings, render         |
//! | page became visible     | visibility   | load settings, render         |

use std::time::Duration;

use price_core::store::{SharedSettingsStore, load_configuration};
use price_core::{PriceBreakdown, PriceConfiguration, PriceEngine, StoredSettings};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

use crate::bridge::{
    BridgeRequest, BridgeRequests, BridgeResponse, ERROR_NO_PRICE_DETAILS, NotificationSender,
    PageNotification, STATUS_SETTINGS_UPDATED, STATUS_VISIBILITY_TOGGLED,
};
use crate::debounce::{Debouncer, TriggerClass};
use crate::overlay::{Overlay, OverlayContent};
use crate::page::{InsertionPoint, MutationRecord, ObservedRoot, PageAdapter, PageEvent};

/// Settle delays per trigger class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    pub initial: Duration,
    pub mutation: Duration,
    pub navigation: Duration,
    pub focus: Duration,
    pub visibility: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            mutation: Duration::from_millis(300),
            navigation: Duration::from_millis(300),
            focus: Duration::from_millis(250),
            visibility: Duration::from_millis(250),
        }
    }
}

/// What a call to [`PageSynchronizer::render`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The overlay content was (re)written.
    Drawn,
    /// Same bid as last time; nothing touched.
    Unchanged,
    /// The overlay is switched off and was removed.
    Hidden,
    /// No readable bid on the page; the overlay was removed.
    NoBid,
    /// Neither the bid block nor the document root could take the overlay.
    NoPlacement,
}

struct Timers {
    initial: Debouncer,
    mutation: Debouncer,
    navigation: Debouncer,
    focus: Debouncer,
    visibility: Debouncer,
}

impl Timers {
    // Order used when several timers are due at the same instant.
    const ORDER: [TriggerClass; 5] = [
        TriggerClass::Initial,
        TriggerClass::Navigation,
        TriggerClass::Mutation,
        TriggerClass::Focus,
        TriggerClass::Visibility,
    ];

    fn new(timings: &SyncTimings) -> Self {
        Self {
            initial: Debouncer::new(TriggerClass::Initial, timings.initial),
            mutation: Debouncer::new(TriggerClass::Mutation, timings.mutation),
            navigation: Debouncer::new(TriggerClass::Navigation, timings.navigation),
            focus: Debouncer::new(TriggerClass::Focus, timings.focus),
            visibility: Debouncer::new(TriggerClass::Visibility, timings.visibility),
        }
    }

    fn get(
        &self,
        class: TriggerClass,
    ) -> &Debouncer {
        match class {
            TriggerClass::Initial => &self.initial,
            TriggerClass::Mutation => &self.mutation,
            TriggerClass::Navigation => &self.navigation,
            TriggerClass::Focus => &self.focus,
            TriggerClass::Visibility => &self.visibility,
        }
    }

    fn get_mut(
        &mut self,
        class: TriggerClass,
    ) -> &mut Debouncer {
        match class {
            TriggerClass::Initial => &mut self.initial,
            TriggerClass::Mutation => &mut self.mutation,
            TriggerClass::Navigation => &mut self.navigation,
            TriggerClass::Focus => &mut self.focus,
            TriggerClass::Visibility => &mut self.visibility,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        Self::ORDER
            .iter()
            .filter_map(|class| self.get(*class).deadline())
            .min()
    }

    /// Disarms every due timer and returns their classes, earliest deadline first.
    fn take_due(
        &mut self,
        now: Instant,
    ) -> Vec<TriggerClass> {
        let mut due = Vec::new();
        for class in Self::ORDER {
            let timer = self.get_mut(class);
            let deadline = timer.deadline();
            if timer.take_if_due(now) {
                due.push((deadline, class));
            }
        }
        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, class)| class).collect()
    }
}

pub struct PageSynchronizer<P> {
    page: P,
    config: PriceConfiguration,
    store: SharedSettingsStore,
    notifier: NotificationSender,
    last_known_bid: Option<Decimal>,
    last_location: String,
    bid_change_pending: bool,
    observing: Option<ObservedRoot>,
    timers: Timers,
}

impl<P: PageAdapter> PageSynchronizer<P> {
    pub fn new(
        page: P,
        config: PriceConfiguration,
        store: SharedSettingsStore,
        notifier: NotificationSender,
    ) -> Self {
        Self::with_timings(page, config, store, notifier, SyncTimings::default())
    }

    pub fn with_timings(
        page: P,
        config: PriceConfiguration,
        store: SharedSettingsStore,
        notifier: NotificationSender,
        timings: SyncTimings,
    ) -> Self {
        let last_location = page.location();
        Self {
            page,
            config,
            store,
            notifier,
            last_known_bid: None,
            last_location,
            bid_change_pending: false,
            observing: None,
            timers: Timers::new(&timings),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn config(&self) -> &PriceConfiguration {
        &self.config
    }

    pub fn last_known_bid(&self) -> Option<Decimal> {
        self.last_known_bid
    }

    /// Subtree currently watched for bid changes, `None` before startup completes.
    pub fn observing(&self) -> Option<ObservedRoot> {
        self.observing
    }

    pub fn is_pending(
        &self,
        class: TriggerClass,
    ) -> bool {
        self.timers.get(class).is_pending()
    }

    /// Schedules the first settings load.
    pub fn start(
        &mut self,
        now: Instant,
    ) {
        debug!(location = %self.last_location, "page synchronizer starting");
        self.timers.initial.schedule(now);
    }

    /// Breakdown for the bid currently on the page.
    pub fn price_details(&self) -> Option<PriceBreakdown> {
        let text = self.page.current_bid_text()?;
        PriceEngine::new(&self.config).compute_from_text(&text)
    }

    /// Brings the overlay in line with the page and configuration.
    ///
    /// With `force` the last-known bid is forgotten first, so the content is
    /// rewritten even if the bid did not change.
    pub fn render(
        &mut self,
        force: bool,
    ) -> RenderOutcome {
        if force {
            self.last_known_bid = None;
        }
        if !self.config.overlay_visible {
            self.clear_overlay();
            return RenderOutcome::Hidden;
        }
        let Some(breakdown) = self.price_details() else {
            debug!("no readable bid on page");
            self.clear_overlay();
            return RenderOutcome::NoBid;
        };
        if self.last_known_bid == Some(breakdown.winning_bid) && self.page.has_overlay() {
            return RenderOutcome::Unchanged;
        }

        if !self.page.has_overlay() {
            let at = match self.page.insertion_anchor() {
                Some(at) => at,
                None if self.page.has_document_root() => {
                    debug!("bid block missing; mounting overlay at document root");
                    InsertionPoint::DocumentRoot
                }
                None => {
                    debug!("nowhere to mount the overlay");
                    return RenderOutcome::NoPlacement;
                }
            };
            self.page.mount_overlay(at, &Overlay::default());
        }

        self.page
            .replace_overlay_content(&OverlayContent::from_breakdown(&breakdown));
        self.last_known_bid = Some(breakdown.winning_bid);
        debug!(
            bid = %breakdown.winning_bid,
            true_price = %breakdown.true_price,
            "overlay updated"
        );
        self.notifier.notify(PageNotification::PriceUpdatedOnPage);
        RenderOutcome::Drawn
    }

    fn clear_overlay(&mut self) {
        self.last_known_bid = None;
        if self.page.remove_overlay() {
            debug!("overlay removed");
        }
    }

    /// Re-reads the stored settings and redraws.
    ///
    /// If the store cannot be read the configuration already held is kept.
    pub async fn load_settings_and_render(&mut self) -> RenderOutcome {
        match load_configuration(self.store.as_ref()).await {
            Ok(config) => self.config = config,
            Err(e) => warn!(error = %e, "settings store unavailable; keeping current configuration"),
        }
        self.render(true)
    }

    /// The user dismissed the overlay from the page.
    pub async fn close_overlay(&mut self) {
        info!("overlay hidden from page");
        self.config.overlay_visible = false;
        if let Err(e) = self.store.save(&StoredSettings::visibility(false)).await {
            warn!(error = %e, "could not persist hidden overlay");
        }
        self.clear_overlay();
        self.notifier
            .notify(PageNotification::VisibilityStateChangedFromPage { visible: false });
    }

    pub async fn handle_page_event(
        &mut self,
        event: PageEvent,
        now: Instant,
    ) {
        match event {
            PageEvent::Mutation(record) => self.observe_mutation(&record, now),
            PageEvent::PopState => {
                let location = self.page.location();
                self.navigated(location, now);
            }
            PageEvent::Focus => self.timers.focus.schedule(now),
            PageEvent::VisibilityChanged { visible: true } => self.timers.visibility.schedule(now),
            PageEvent::VisibilityChanged { visible: false } => trace!("page hidden"),
            PageEvent::CloseClicked => self.close_overlay().await,
        }
    }

    fn observe_mutation(
        &mut self,
        record: &MutationRecord,
        now: Instant,
    ) {
        let location = self.page.location();
        if location != self.last_location {
            self.navigated(location, now);
            return;
        }

        let Some(root) = self.observing else {
            return;
        };
        if self.timers.navigation.is_pending() {
            trace!("mutation folded into pending navigation reload");
            return;
        }
        let relevant = self.page.touches_bid(record);
        if relevant || root == ObservedRoot::DocumentBody {
            self.bid_change_pending |= relevant;
            self.timers.mutation.schedule(now);
        }
    }

    fn navigated(
        &mut self,
        location: String,
        now: Instant,
    ) {
        info!(from = %self.last_location, to = %location, "page navigation detected");
        self.last_location = location;
        self.clear_overlay();
        self.timers.mutation.cancel();
        self.bid_change_pending = false;
        self.timers.navigation.schedule(now);
    }

    fn start_observing(&mut self) {
        let root = self.page.observable_root();
        if self.observing != Some(root) {
            info!(?root, "observing page for bid changes");
        }
        self.observing = Some(root);
    }

    pub async fn handle_request(
        &mut self,
        request: BridgeRequest,
    ) -> BridgeResponse {
        match request {
            BridgeRequest::SettingsUpdated { new_settings } => {
                if let Err(e) = new_settings.validate() {
                    warn!(error = %e, "rejecting settings update");
                    return BridgeResponse::error(e.to_string());
                }
                info!("settings updated from panel");
                self.config = new_settings;
                self.supersede_pending_reloads();
                self.render(true);
                BridgeResponse::status(STATUS_SETTINGS_UPDATED)
            }
            BridgeRequest::VisibilityToggle { show } => {
                info!(show, "overlay visibility toggled from panel");
                self.config.overlay_visible = show;
                self.supersede_pending_reloads();
                self.render(true);
                BridgeResponse::status(STATUS_VISIBILITY_TOGGLED)
            }
            BridgeRequest::GetPriceDetails => match self.price_details() {
                Some(breakdown) => BridgeResponse::PriceDetails(breakdown),
                None => BridgeResponse::error(ERROR_NO_PRICE_DETAILS),
            },
        }
    }

    // A panel write is newer than anything a pending focus or visibility
    // reload would read. Navigation reloads stay: the new item still needs drawing.
    fn supersede_pending_reloads(&mut self) {
        for class in [TriggerClass::Focus, TriggerClass::Visibility] {
            let timer = self.timers.get_mut(class);
            if timer.is_pending() {
                debug!(%class, "pending reload superseded by panel update");
                timer.cancel();
            }
        }
    }

    /// Runs every timer whose deadline has passed. Returns the classes that fired.
    pub async fn fire_due(
        &mut self,
        now: Instant,
    ) -> Vec<TriggerClass> {
        let fired = self.timers.take_due(now);
        for class in &fired {
            trace!(%class, "timer fired");
            match class {
                TriggerClass::Initial => {
                    self.load_settings_and_render().await;
                    self.start_observing();
                }
                TriggerClass::Mutation => {
                    let relevant = std::mem::take(&mut self.bid_change_pending);
                    if relevant && self.config.overlay_visible {
                        self.render(false);
                    }
                }
                TriggerClass::Navigation => {
                    self.load_settings_and_render().await;
                    if self.observing.is_some() {
                        self.start_observing();
                    }
                }
                TriggerClass::Focus | TriggerClass::Visibility => {
                    self.load_settings_and_render().await;
                }
            }
        }
        fired
    }

    /// Drives the synchronizer until both the page event stream and the
    /// bridge request stream are closed, then hands it back.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PageEvent>,
        mut requests: BridgeRequests,
    ) -> Self {
        self.start(Instant::now());
        let mut events_open = true;
        let mut requests_open = true;

        while events_open || requests_open {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_page_event(event, Instant::now()).await,
                    None => {
                        debug!("page event stream closed");
                        events_open = false;
                    }
                },
                envelope = requests.recv(), if requests_open => match envelope {
                    Some(envelope) => {
                        let response = self.handle_request(envelope.request).await;
                        envelope.reply.send(response);
                    }
                    None => {
                        debug!("bridge request stream closed");
                        requests_open = false;
                    }
                },
                _ = wait_until(deadline) => {
                    self.fire_due(Instant::now()).await;
                }
            }
        }

        info!("page synchronizer stopped");
        self
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use price_core::SettingsStore;
    use price_core::store::InMemorySettingsStore;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::bridge::notifications;
    use crate::page::InMemoryPage;

    const LOT_URL: &str = "https://www.mac.bid/lot/42";

    struct Fixture {
        sync: PageSynchronizer<InMemoryPage>,
        page: InMemoryPage,
        store: Arc<InMemorySettingsStore>,
        notes: UnboundedReceiver<PageNotification>,
    }

    fn fixture(page: InMemoryPage) -> Fixture {
        let store = InMemorySettingsStore::new_shared();
        let (notifier, notes) = notifications();
        let sync = PageSynchronizer::new(
            page.clone(),
            PriceConfiguration::default(),
            store.clone(),
            notifier,
        );
        Fixture {
            sync,
            page,
            store,
            notes,
        }
    }

    fn drain(notes: &mut UnboundedReceiver<PageNotification>) -> Vec<PageNotification> {
        let mut seen = Vec::new();
        while let Ok(note) = notes.try_recv() {
            seen.push(note);
        }
        seen
    }

    async fn started(page: InMemoryPage) -> (Fixture, Instant) {
        let mut f = fixture(page);
        let t0 = Instant::now();
        f.sync.start(t0);
        f.sync.fire_due(t0 + Duration::from_millis(100)).await;
        (f, t0 + Duration::from_millis(100))
    }

    // =========================================================================
    // render
    // =========================================================================

    #[test]
    fn render_draws_once_per_bid() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$100.00"));

        assert_eq!(f.sync.render(false), RenderOutcome::Drawn);
        assert_eq!(f.sync.render(false), RenderOutcome::Unchanged);

        assert_eq!(f.page.mounts(), 1);
        assert_eq!(f.page.content_writes(), 1);
        assert_eq!(drain(&mut f.notes), vec![PageNotification::PriceUpdatedOnPage]);
        assert!(f.page.overlay_text().unwrap().contains("Estimated Total: $126.26"));
    }

    #[test]
    fn forced_render_rewrites_same_bid_in_place() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$100.00"));
        f.sync.render(false);

        assert_eq!(f.sync.render(true), RenderOutcome::Drawn);

        assert_eq!(f.page.mounts(), 1);
        assert_eq!(f.page.content_writes(), 2);
    }

    #[test]
    fn unparsable_bid_removes_overlay() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$100.00"));
        f.sync.render(false);
        f.page.set_bid_text(Some("N/A"));

        assert_eq!(f.sync.render(false), RenderOutcome::NoBid);

        assert!(f.page.overlay().is_none());
        assert_eq!(f.sync.last_known_bid(), None);
    }

    #[test]
    fn bid_too_large_to_price_is_treated_as_unreadable() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$100.00"));
        f.sync.render(false);
        f.page
            .set_bid_text(Some("$79,228,162,514,264,337,593,543,950,335"));

        assert_eq!(f.sync.render(false), RenderOutcome::NoBid);

        assert!(f.page.overlay().is_none());
        assert_eq!(f.sync.last_known_bid(), None);
        assert_eq!(f.sync.price_details(), None);
    }

    #[test]
    fn missing_bid_block_falls_back_to_document_root() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$5").without_bid_block());

        assert_eq!(f.sync.render(false), RenderOutcome::Drawn);

        assert_eq!(f.page.overlay().unwrap().at, InsertionPoint::DocumentRoot);
    }

    #[test]
    fn no_placement_aborts_silently() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$5").without_body());

        assert_eq!(f.sync.render(false), RenderOutcome::NoPlacement);

        assert!(f.page.overlay().is_none());
        assert!(drain(&mut f.notes).is_empty());
    }

    #[test]
    fn overlay_keeps_close_button_across_redraws() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$1.00"));
        f.sync.render(false);
        f.page.set_bid_text(Some("$2.00"));
        f.sync.render(false);

        let overlay = f.page.overlay().unwrap();
        assert_eq!(overlay.shell.close_button.id, "macbid-price-overlay-close-btn-id");
        assert!(overlay.content.unwrap().to_string().contains("Current Bid: $2.00"));
    }

    // =========================================================================
    // startup and timers
    // =========================================================================

    #[tokio::test]
    async fn startup_loads_settings_then_observes() {
        let page = InMemoryPage::new(LOT_URL).with_bid("$100.00");
        let mut f = fixture(page);
        f.store
            .save(&StoredSettings {
                lot_fee: Some(dec!(5.00)),
                ..Default::default()
            })
            .await
            .unwrap();
        let t0 = Instant::now();
        f.sync.start(t0);

        assert!(f.sync.fire_due(t0 + Duration::from_millis(99)).await.is_empty());
        let fired = f.sync.fire_due(t0 + Duration::from_millis(100)).await;

        assert_eq!(fired, vec![TriggerClass::Initial]);
        assert_eq!(f.sync.config().lot_fee, dec!(5.00));
        assert_eq!(f.sync.observing(), Some(ObservedRoot::BidContainer));
        assert!(f.page.overlay_text().unwrap().contains("Lot Fee: +$5.00"));
    }

    #[tokio::test]
    async fn mutation_burst_renders_once() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;
        drain(&mut f.notes);

        for (i, bid) in ["$11.00", "$12.00", "$13.00"].into_iter().enumerate() {
            let record = f.page.set_bid_text(Some(bid));
            let at = t + Duration::from_millis(100 * i as u64);
            f.sync.handle_page_event(PageEvent::Mutation(record), at).await;
        }

        assert!(f.sync.fire_due(t + Duration::from_millis(499)).await.is_empty());
        assert_eq!(
            f.sync.fire_due(t + Duration::from_millis(500)).await,
            vec![TriggerClass::Mutation]
        );
        assert_eq!(drain(&mut f.notes), vec![PageNotification::PriceUpdatedOnPage]);
        assert_eq!(f.sync.last_known_bid(), Some(dec!(13.00)));
    }

    #[tokio::test]
    async fn unrelated_mutations_do_not_render() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;
        let writes = f.page.content_writes();

        let record = f.page.unrelated_mutation();
        f.sync.handle_page_event(PageEvent::Mutation(record), t).await;
        f.sync.fire_due(t + Duration::from_secs(1)).await;

        assert_eq!(f.page.content_writes(), writes);
    }

    #[tokio::test]
    async fn mutations_before_observation_are_ignored() {
        let mut f = fixture(InMemoryPage::new(LOT_URL).with_bid("$10.00"));
        let t0 = Instant::now();

        let record = f.page.set_bid_text(Some("$11.00"));
        f.sync.handle_page_event(PageEvent::Mutation(record), t0).await;

        assert!(!f.sync.is_pending(TriggerClass::Mutation));
    }

    #[tokio::test]
    async fn navigation_removes_overlay_and_reloads_after_settle() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;
        drain(&mut f.notes);

        let record = f.page.navigate("https://www.mac.bid/lot/43");
        f.sync.handle_page_event(PageEvent::Mutation(record), t).await;
        assert!(f.page.overlay().is_none());

        for ms in [50, 120, 200] {
            let record = f.page.set_bid_text(Some("$20.00"));
            f.sync
                .handle_page_event(PageEvent::Mutation(record), t + Duration::from_millis(ms))
                .await;
        }
        let fired = f.sync.fire_due(t + Duration::from_millis(300)).await;

        assert_eq!(fired, vec![TriggerClass::Navigation]);
        assert_eq!(drain(&mut f.notes), vec![PageNotification::PriceUpdatedOnPage]);
        assert_eq!(f.sync.last_known_bid(), Some(dec!(20.00)));
        assert!(!f.sync.is_pending(TriggerClass::Mutation));
    }

    #[tokio::test]
    async fn popstate_counts_as_navigation() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;

        f.sync.handle_page_event(PageEvent::PopState, t).await;

        assert!(f.sync.is_pending(TriggerClass::Navigation));
        assert_eq!(f.sync.last_known_bid(), None);
    }

    #[tokio::test]
    async fn focus_and_visible_schedule_reloads() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;

        f.sync.handle_page_event(PageEvent::Focus, t).await;
        f.sync
            .handle_page_event(PageEvent::VisibilityChanged { visible: false }, t)
            .await;
        assert!(!f.sync.is_pending(TriggerClass::Visibility));
        f.sync
            .handle_page_event(PageEvent::VisibilityChanged { visible: true }, t)
            .await;

        let fired = f.sync.fire_due(t + Duration::from_millis(250)).await;
        assert_eq!(fired, vec![TriggerClass::Focus, TriggerClass::Visibility]);
    }

    #[tokio::test]
    async fn store_failure_keeps_current_configuration() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$100.00")).await;
        f.sync
            .handle_request(BridgeRequest::SettingsUpdated {
                new_settings: PriceConfiguration {
                    lot_fee: dec!(9.00),
                    ..Default::default()
                },
            })
            .await;
        f.store.set_unavailable(true);

        f.sync.handle_page_event(PageEvent::Focus, t).await;
        f.sync.fire_due(t + Duration::from_millis(250)).await;

        assert_eq!(f.sync.config().lot_fee, dec!(9.00));
        assert!(f.page.overlay_text().unwrap().contains("Lot Fee: +$9.00"));
    }

    // =========================================================================
    // close and bridge requests
    // =========================================================================

    #[tokio::test]
    async fn close_persists_hidden_and_notifies() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;
        drain(&mut f.notes);
        assert_eq!(f.sync.last_known_bid(), Some(dec!(10.00)));

        f.sync.handle_page_event(PageEvent::CloseClicked, t).await;

        assert!(f.page.overlay().is_none());
        assert_eq!(f.sync.last_known_bid(), None);
        assert!(!f.sync.config().overlay_visible);
        assert_eq!(f.store.load().await.unwrap().show_price_overlay, Some(false));
        assert_eq!(
            drain(&mut f.notes),
            vec![PageNotification::VisibilityStateChangedFromPage { visible: false }]
        );
    }

    #[tokio::test]
    async fn close_with_broken_store_still_hides() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$10.00")).await;
        f.store.set_unavailable(true);

        f.sync.handle_page_event(PageEvent::CloseClicked, t).await;

        assert!(f.page.overlay().is_none());
    }

    #[tokio::test]
    async fn toggle_off_then_on_restores_overlay() {
        let (mut f, _) = started(InMemoryPage::new(LOT_URL).with_bid("$100.00")).await;
        let before = f.page.overlay_text();

        assert_eq!(f.sync.last_known_bid(), Some(dec!(100.00)));

        let off = f.sync.handle_request(BridgeRequest::VisibilityToggle { show: false }).await;
        assert!(f.page.overlay().is_none());
        assert_eq!(f.sync.last_known_bid(), None);
        let on = f.sync.handle_request(BridgeRequest::VisibilityToggle { show: true }).await;

        assert_eq!(off, BridgeResponse::status(STATUS_VISIBILITY_TOGGLED));
        assert_eq!(on, BridgeResponse::status(STATUS_VISIBILITY_TOGGLED));
        assert_eq!(f.page.overlay_text(), before);
    }

    #[tokio::test]
    async fn settings_update_supersedes_pending_reloads() {
        let (mut f, t) = started(InMemoryPage::new(LOT_URL).with_bid("$100.00")).await;
        f.sync.handle_page_event(PageEvent::Focus, t).await;
        f.sync
            .handle_page_event(PageEvent::VisibilityChanged { visible: true }, t)
            .await;
        f.sync.handle_page_event(PageEvent::PopState, t).await;

        let response = f
            .sync
            .handle_request(BridgeRequest::SettingsUpdated {
                new_settings: PriceConfiguration {
                    sales_tax_rate: dec!(0),
                    ..Default::default()
                },
            })
            .await;

        assert_eq!(response, BridgeResponse::status(STATUS_SETTINGS_UPDATED));
        assert!(!f.sync.is_pending(TriggerClass::Focus));
        assert!(!f.sync.is_pending(TriggerClass::Visibility));
        assert!(f.sync.is_pending(TriggerClass::Navigation));
    }

    #[tokio::test]
    async fn negative_settings_update_is_rejected() {
        let (mut f, _) = started(InMemoryPage::new(LOT_URL).with_bid("$100.00")).await;

        let response = f
            .sync
            .handle_request(BridgeRequest::SettingsUpdated {
                new_settings: PriceConfiguration {
                    lot_fee: dec!(-1),
                    ..Default::default()
                },
            })
            .await;

        assert!(matches!(response, BridgeResponse::Error { .. }));
        assert_eq!(f.sync.config().lot_fee, dec!(3.00));
    }

    #[tokio::test]
    async fn price_details_follow_the_page() {
        let (mut f, _) = started(InMemoryPage::new(LOT_URL)).await;

        let missing = f.sync.handle_request(BridgeRequest::GetPriceDetails).await;
        f.page.set_bid_text(Some("$100.00"));
        let present = f.sync.handle_request(BridgeRequest::GetPriceDetails).await;

        assert_eq!(missing, BridgeResponse::error(ERROR_NO_PRICE_DETAILS));
        let BridgeResponse::PriceDetails(breakdown) = present else {
            panic!("expected details, got {present:?}");
        };
        assert_eq!(breakdown.true_price, dec!(126.26));
    }
}
