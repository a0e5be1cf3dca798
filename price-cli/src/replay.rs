//! Replays a recorded session against a live [`PageSynchronizer`].
//!
//! The page is an [`InMemoryPage`]; panel actions go through a freshly
//! opened [`SettingsPanel`] each time, the way a popup opens over the
//! current tab. Everything the page reports is collected into a transcript.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use price_core::PriceConfiguration;
use price_core::store::{SharedSettingsStore, load_configuration};
use price_sync::bridge::{self, BridgeClient, PageNotification};
use price_sync::panel::{ActivePage, SettingsPanel};
use price_sync::{InMemoryPage, PageAdapter, PageEvent, PageSynchronizer};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::session::{SessionEvent, SessionStep};

/// Time allowed after the last step for pending reloads to finish.
const SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Human-readable timeline, one entry per observable change.
    pub transcript: Vec<String>,
    /// Overlay total after every redraw, in order.
    pub totals: Vec<String>,
    pub final_overlay: Option<String>,
    pub final_configuration: PriceConfiguration,
}

impl ReplayReport {
    fn record(
        &mut self,
        elapsed: Duration,
        entry: impl Into<String>,
    ) {
        self.transcript
            .push(format!("[{:>6}ms] {}", elapsed.as_millis(), entry.into()));
    }
}

struct Replay {
    page: InMemoryPage,
    store: SharedSettingsStore,
    client: BridgeClient,
    events: mpsc::Sender<PageEvent>,
    started: Instant,
    report: ReplayReport,
}

impl Replay {
    fn elapsed(&self) -> Duration {
        Instant::now() - self.started
    }

    fn on_notification(
        &mut self,
        notification: PageNotification,
    ) {
        let elapsed = self.elapsed();
        match notification {
            PageNotification::PriceUpdatedOnPage => {
                let content = self.page.overlay().and_then(|o| o.content);
                let total = content
                    .as_ref()
                    .and_then(|c| c.total())
                    .unwrap_or("?")
                    .to_string();
                self.report.record(elapsed, format!("overlay updated: total {total}"));
                self.report.totals.push(total);
            }
            PageNotification::VisibilityStateChangedFromPage { visible } => {
                let state = if visible { "shown" } else { "hidden" };
                self.report.record(elapsed, format!("overlay {state} from page"));
            }
        }
    }

    async fn panel(&self) -> SettingsPanel {
        let active = ActivePage {
            url: self.page.location(),
            client: self.client.clone(),
        };
        SettingsPanel::open(self.store.clone(), Some(active)).await
    }

    async fn page_event(
        &self,
        event: PageEvent,
    ) -> Result<()> {
        if self.events.send(event).await.is_err() {
            bail!("page synchronizer stopped unexpectedly");
        }
        Ok(())
    }

    async fn apply(
        &mut self,
        event: &SessionEvent,
    ) -> Result<()> {
        debug!(?event, "replaying step");
        match event {
            SessionEvent::Bid(text) => {
                let record = self.page.set_bid_text(text.as_deref());
                self.page_event(PageEvent::Mutation(record)).await?;
            }
            SessionEvent::Mutate => {
                let record = self.page.unrelated_mutation();
                self.page_event(PageEvent::Mutation(record)).await?;
            }
            SessionEvent::Navigate(url) => {
                let record = self.page.navigate(url.as_str());
                self.page_event(PageEvent::Mutation(record)).await?;
            }
            SessionEvent::PopState(url) => {
                self.page.set_location(url.as_str());
                self.page_event(PageEvent::PopState).await?;
            }
            SessionEvent::Focus => self.page_event(PageEvent::Focus).await?,
            SessionEvent::Hidden => {
                self.page_event(PageEvent::VisibilityChanged { visible: false })
                    .await?
            }
            SessionEvent::Visible => {
                self.page_event(PageEvent::VisibilityChanged { visible: true })
                    .await?
            }
            SessionEvent::Close => self.page_event(PageEvent::CloseClicked).await?,
            SessionEvent::Settings {
                buyers_premium_rate,
                lot_fee,
                sales_tax_rate,
            } => {
                let mut panel = self.panel().await;
                let form = panel.form_mut();
                form.buyers_premium_rate = buyers_premium_rate.clone();
                form.lot_fee = lot_fee.clone();
                form.sales_tax_rate = sales_tax_rate.clone();
                let elapsed = self.elapsed();
                match panel.save().await {
                    Ok(view) => {
                        self.report.record(elapsed, "settings saved");
                        for line in view.to_string().lines() {
                            self.report.record(elapsed, format!("  panel: {line}"));
                        }
                    }
                    Err(e) => {
                        self.report.record(elapsed, format!("settings rejected: {e}"));
                    }
                }
            }
            SessionEvent::Toggle(show) => {
                let mut panel = self.panel().await;
                panel.toggle_visibility(*show).await;
                let state = if *show { "on" } else { "off" };
                let elapsed = self.elapsed();
                self.report.record(elapsed, format!("panel toggle {state}"));
            }
            SessionEvent::Details => {
                let view = self.panel().await.refresh_price_details().await;
                let elapsed = self.elapsed();
                for line in view.to_string().lines() {
                    self.report.record(elapsed, format!("panel: {line}"));
                }
            }
        }
        Ok(())
    }
}

/// Runs `steps` against a page that starts at `start_url`.
pub async fn replay(
    steps: &[SessionStep],
    start_url: &str,
    store: SharedSettingsStore,
) -> Result<ReplayReport> {
    let config = match load_configuration(store.as_ref()).await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "settings store unavailable; starting with defaults");
            PriceConfiguration::default()
        }
    };

    let page = InMemoryPage::new(start_url);
    let (notifier, mut notes) = bridge::notifications();
    let (events, events_rx) = mpsc::channel(64);
    let (client, requests) = bridge::channel();
    let sync = PageSynchronizer::new(page.clone(), config, store.clone(), notifier);
    let task = tokio::spawn(sync.run(events_rx, requests));

    info!(steps = steps.len(), url = start_url, "replaying session");
    let mut replay = Replay {
        page,
        store,
        client,
        events,
        started: Instant::now(),
        report: ReplayReport::default(),
    };

    for step in steps {
        let due = replay.started + step.at;
        loop {
            tokio::select! {
                biased;
                Some(note) = notes.recv() => replay.on_notification(note),
                _ = sleep_until(due) => break,
            }
        }
        replay.apply(&step.event).await?;
    }

    let settle = sleep(SETTLE);
    tokio::pin!(settle);
    loop {
        tokio::select! {
            biased;
            Some(note) = notes.recv() => replay.on_notification(note),
            _ = &mut settle => break,
        }
    }

    let Replay {
        page,
        client,
        events,
        mut report,
        ..
    } = replay;
    drop(events);
    drop(client);
    let sync = task.await.context("page synchronizer task failed")?;
    while let Ok(note) = notes.try_recv() {
        debug!(?note, "notification after shutdown");
    }

    report.final_overlay = page.overlay_text();
    report.final_configuration = sync.config().clone();
    Ok(report)
}
