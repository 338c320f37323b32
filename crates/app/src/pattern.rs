//! Pattern-sequence watcher: detects named events arriving in order within
//! a time window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tripwire_domain::event::Event;
use tripwire_domain::id::SubscriptionId;
use tripwire_domain::time::{Timestamp, within_window};

use crate::event_bus::EventBus;

/// What a single event did to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The event was the next expected one; the sequence is not complete yet.
    Advanced,
    /// The sequence completed within the window.
    Completed,
    /// The sequence completed too late. The attempt is discarded.
    Expired,
    /// The event broke the attempt but starts a new one.
    Restarted,
    /// The event broke the attempt.
    Reset,
    /// The matcher has nothing to match.
    Ignored,
}

/// Incremental matcher for one ordered sequence.
///
/// The window is measured from the first event of the current attempt to
/// the event completing it, using the events' own timestamps. Events made
/// with [`Event::new`] carry wall-clock time, so a system clock step between
/// two events stretches or shrinks the window. Producers needing a stable
/// window stamp events themselves with [`Event::at`].
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    sequence: Vec<String>,
    within_ms: u64,
    index: usize,
    attempt_start: Option<Timestamp>,
}

impl PatternMatcher {
    #[must_use]
    pub fn new(sequence: Vec<String>, within_ms: u64) -> Self {
        Self {
            sequence,
            within_ms,
            index: 0,
            attempt_start: None,
        }
    }

    /// Position of the next expected event in the sequence.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Feed one event.
    pub fn observe(&mut self, event: &Event) -> MatchOutcome {
        let Some(first) = self.sequence.first() else {
            return MatchOutcome::Ignored;
        };
        if self.index == 0 {
            self.attempt_start = Some(event.timestamp);
        }

        if event.name == self.sequence[self.index] {
            self.index += 1;
            if self.index < self.sequence.len() {
                return MatchOutcome::Advanced;
            }
            self.index = 0;
            let start = self.attempt_start.unwrap_or(event.timestamp);
            if within_window(start, event.timestamp, self.within_ms) {
                MatchOutcome::Completed
            } else {
                MatchOutcome::Expired
            }
        } else if event.name == *first {
            self.index = 1;
            self.attempt_start = Some(event.timestamp);
            MatchOutcome::Restarted
        } else {
            self.index = 0;
            MatchOutcome::Reset
        }
    }
}

/// Subscribes a [`PatternMatcher`] to the bus and calls back on completion.
///
/// One handler is registered per distinct event name of the sequence. The
/// completion callback runs on the emitting thread with no matcher lock held.
/// Dropping the watcher disposes it.
pub struct PatternSequenceWatcher {
    bus: EventBus,
    subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
    disposed: Arc<AtomicBool>,
}

impl PatternSequenceWatcher {
    pub fn new(
        bus: &EventBus,
        sequence: Vec<String>,
        within_ms: u64,
        on_complete: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(sequence.len());
        for name in &sequence {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        let matcher = Arc::new(Mutex::new(PatternMatcher::new(sequence, within_ms)));
        let on_complete: Arc<dyn Fn() + Send + Sync> = Arc::new(on_complete);
        let disposed = Arc::new(AtomicBool::new(false));

        let subscriptions = names
            .into_iter()
            .map(|name| {
                let matcher = Arc::clone(&matcher);
                let on_complete = Arc::clone(&on_complete);
                let disposed = Arc::clone(&disposed);
                let id = bus.subscribe(name.clone(), move |event| {
                    let outcome = matcher
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .observe(event);
                    match outcome {
                        MatchOutcome::Completed if !disposed.load(Ordering::Acquire) => {
                            on_complete();
                        }
                        MatchOutcome::Expired => {
                            tracing::debug!(event = %event.name, "pattern completed outside its window");
                        }
                        _ => {}
                    }
                });
                (name, id)
            })
            .collect();

        Self {
            bus: bus.clone(),
            subscriptions: Mutex::new(subscriptions),
            disposed,
        }
    }

    /// Unsubscribe every handler. Calling it again has no effect.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        let subscriptions =
            std::mem::take(&mut *self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner));
        for (name, id) in subscriptions {
            self.bus.unsubscribe(&name, id);
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for PatternSequenceWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for PatternSequenceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternSequenceWatcher")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
