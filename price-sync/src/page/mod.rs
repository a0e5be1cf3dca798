//! Host page seam.
//!
//! The synchronizer never touches a document directly. Everything it needs
//! from the live page (reading the bid, placing the overlay, deciding
//! whether a mutation matters) goes through [`PageAdapter`].

mod memory;

pub use memory::{InMemoryPage, MountedOverlay};

use crate::overlay::{Overlay, OverlayContent};

/// Where the overlay is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    /// Right after the block that holds the bid.
    AfterBidBlock,
    /// Appended to the document root.
    DocumentRoot,
}

/// Subtree watched for bid changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedRoot {
    BidContainer,
    /// Fallback when the bid container is not on the page yet.
    DocumentBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
}

/// One observed change in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Selector path of the changed node.
    pub target: String,
}

impl MutationRecord {
    pub fn new(
        kind: MutationKind,
        target: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

/// Signals the host page delivers to the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Mutation(MutationRecord),
    /// History navigation (back/forward).
    PopState,
    /// The window regained focus.
    Focus,
    VisibilityChanged { visible: bool },
    /// The overlay's close button was activated.
    CloseClicked,
}

/// Structural selectors for the auction site's bid markup.
///
/// These change whenever the site redesigns; they are kept as data so only
/// adapters depend on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacBidSelectors {
    pub bid_container: &'static str,
    pub bid_value: &'static str,
    pub bid_block: &'static str,
}

impl Default for MacBidSelectors {
    fn default() -> Self {
        Self {
            bid_container: "div.h1.font-weight-normal.text-accent.mb-0",
            bid_value: "div.h1.font-weight-normal.text-accent.mb-0 div.d-flex span:last-of-type",
            bid_block: "div.d-flex.flex-column.flex-sm-row",
        }
    }
}

pub trait PageAdapter: Send {
    /// Raw text of the current bid element, `None` when it is absent.
    fn current_bid_text(&self) -> Option<String>;

    /// Preferred overlay position next to the bid, `None` when the bid block is missing.
    fn insertion_anchor(&self) -> Option<InsertionPoint>;

    /// Whether the document root can take the overlay as a fallback.
    fn has_document_root(&self) -> bool;

    fn observable_root(&self) -> ObservedRoot;

    /// Current page URL.
    fn location(&self) -> String;

    /// Whether `record` changed something inside the bid container.
    fn touches_bid(
        &self,
        record: &MutationRecord,
    ) -> bool;

    fn has_overlay(&self) -> bool;

    fn mount_overlay(
        &mut self,
        at: InsertionPoint,
        overlay: &Overlay,
    );

    /// Replaces the content area of the mounted overlay. The close button stays.
    fn replace_overlay_content(
        &mut self,
        content: &OverlayContent,
    );

    /// Removes the overlay. Returns `false` if none was mounted.
    fn remove_overlay(&mut self) -> bool;
}
