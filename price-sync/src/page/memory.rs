use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    InsertionPoint, MacBidSelectors, MutationKind, MutationRecord, ObservedRoot, PageAdapter,
};
use crate::overlay::{Overlay, OverlayContent};

/// The overlay as it currently sits in an [`InMemoryPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedOverlay {
    pub at: InsertionPoint,
    pub shell: Overlay,
    pub content: Option<OverlayContent>,
}

#[derive(Debug)]
struct PageState {
    location: String,
    bid_text: Option<String>,
    bid_block_present: bool,
    body_present: bool,
    overlay: Option<MountedOverlay>,
    mounts: usize,
    content_writes: usize,
}

/// Scripted page model.
///
/// Clones share the same document, so a test or a replay driver can keep a
/// handle while the synchronizer owns another one. The mutating helpers
/// return the [`MutationRecord`] a real observer would have reported.
#[derive(Debug, Clone)]
pub struct InMemoryPage {
    state: Arc<Mutex<PageState>>,
    selectors: MacBidSelectors,
}

impl InMemoryPage {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                location: location.into(),
                bid_text: None,
                bid_block_present: true,
                body_present: true,
                overlay: None,
                mounts: 0,
                content_writes: 0,
            })),
            selectors: MacBidSelectors::default(),
        }
    }

    pub fn with_bid(
        self,
        text: impl Into<String>,
    ) -> Self {
        self.state().bid_text = Some(text.into());
        self
    }

    /// A page whose layout lacks the bid block, so the overlay falls back to the root.
    pub fn without_bid_block(self) -> Self {
        self.state().bid_block_present = false;
        self
    }

    /// A page with nowhere to put the overlay at all.
    pub fn without_body(self) -> Self {
        {
            let mut state = self.state();
            state.bid_block_present = false;
            state.body_present = false;
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets (or removes, with `None`) the bid element's text.
    pub fn set_bid_text(
        &self,
        text: Option<&str>,
    ) -> MutationRecord {
        let mut state = self.state();
        let kind = match (&state.bid_text, text) {
            (Some(_), Some(_)) => MutationKind::CharacterData,
            _ => MutationKind::ChildList,
        };
        state.bid_text = text.map(str::to_string);
        MutationRecord::new(kind, self.selectors.bid_value)
    }

    /// Client-side navigation: the URL changes and the body is re-rendered.
    pub fn navigate(
        &self,
        location: impl Into<String>,
    ) -> MutationRecord {
        self.state().location = location.into();
        MutationRecord::new(MutationKind::ChildList, "body")
    }

    /// Changes the URL without any DOM change, as history navigation does.
    pub fn set_location(
        &self,
        location: impl Into<String>,
    ) {
        self.state().location = location.into();
    }

    /// A change somewhere outside the bid container.
    pub fn unrelated_mutation(&self) -> MutationRecord {
        MutationRecord::new(MutationKind::ChildList, "body div.footer")
    }

    pub fn overlay(&self) -> Option<MountedOverlay> {
        self.state().overlay.clone()
    }

    pub fn overlay_text(&self) -> Option<String> {
        self.state()
            .overlay
            .as_ref()
            .and_then(|o| o.content.as_ref())
            .map(ToString::to_string)
    }

    /// How many times an overlay was inserted.
    pub fn mounts(&self) -> usize {
        self.state().mounts
    }

    /// How many times the content area was rewritten.
    pub fn content_writes(&self) -> usize {
        self.state().content_writes
    }
}

impl PageAdapter for InMemoryPage {
    fn current_bid_text(&self) -> Option<String> {
        self.state().bid_text.clone()
    }

    fn insertion_anchor(&self) -> Option<InsertionPoint> {
        let state = self.state();
        (state.bid_block_present && state.bid_text.is_some()).then_some(InsertionPoint::AfterBidBlock)
    }

    fn has_document_root(&self) -> bool {
        self.state().body_present
    }

    fn observable_root(&self) -> ObservedRoot {
        if self.state().bid_text.is_some() {
            ObservedRoot::BidContainer
        } else {
            ObservedRoot::DocumentBody
        }
    }

    fn location(&self) -> String {
        self.state().location.clone()
    }

    fn touches_bid(
        &self,
        record: &MutationRecord,
    ) -> bool {
        record.target.starts_with(self.selectors.bid_container)
    }

    fn has_overlay(&self) -> bool {
        self.state().overlay.is_some()
    }

    fn mount_overlay(
        &mut self,
        at: InsertionPoint,
        overlay: &Overlay,
    ) {
        let mut state = self.state();
        state.overlay = Some(MountedOverlay {
            at,
            shell: overlay.clone(),
            content: None,
        });
        state.mounts += 1;
    }

    fn replace_overlay_content(
        &mut self,
        content: &OverlayContent,
    ) {
        let mut state = self.state();
        if let Some(overlay) = state.overlay.as_mut() {
            overlay.content = Some(content.clone());
            state.content_writes += 1;
        }
    }

    fn remove_overlay(&mut self) -> bool {
        self.state().overlay.take().is_some()
    }
}
