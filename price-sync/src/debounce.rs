//! Trailing debounce timers.
//!
//! A [`Debouncer`] holds at most one pending deadline. Scheduling again
//! replaces it, so only the last trigger of a burst fires, `delay` after the
//! burst went quiet. Timers do not run on their own: the owner asks for the
//! earliest [`Debouncer::deadline`], sleeps until then and calls
//! [`Debouncer::take_if_due`].

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Source of a debounced re-evaluation. Each class has its own timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerClass {
    /// First settings load after the synchronizer starts.
    Initial,
    /// Changes under the bid container.
    Mutation,
    /// The host window regained focus.
    Focus,
    /// The page became visible again.
    Visibility,
    /// The displayed item changed without a full reload.
    Navigation,
}

impl fmt::Display for TriggerClass {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Mutation => "mutation",
            Self::Focus => "focus",
            Self::Visibility => "visibility",
            Self::Navigation => "navigation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    class: TriggerClass,
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(
        class: TriggerClass,
        delay: Duration,
    ) -> Self {
        Self {
            class,
            delay,
            deadline: None,
        }
    }

    pub fn class(&self) -> TriggerClass {
        self.class
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arms the timer to fire `delay` after `now`, dropping any earlier deadline.
    pub fn schedule(
        &mut self,
        now: Instant,
    ) {
        if self.deadline.is_some() {
            tracing::trace!(class = %self.class, "rescheduling pending timer");
        }
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarms the timer and returns `true` if its deadline has passed.
    pub fn take_if_due(
        &mut self,
        now: Instant,
    ) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
