//! In-process event bus with named channels and synchronous dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tripwire_domain::event::Event;
use tripwire_domain::id::SubscriptionId;

/// Callback invoked for every event emitted on a subscribed name.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

type Channels = HashMap<String, Vec<(SubscriptionId, EventHandler)>>;

/// Named publish/subscribe channel.
///
/// [`emit`](Self::emit) runs every handler on the caller's thread, in
/// subscription order, over a snapshot taken when the call starts. Handlers
/// may subscribe or unsubscribe (themselves or others) while being
/// dispatched; the change applies from the next emission on.
///
/// Cloning is cheap and yields a handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<Channels>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `name`.
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribe_handler(name, Arc::new(handler))
    }

    /// Register an already shared handler.
    ///
    /// The same handler may be registered several times; every registration
    /// gets its own [`SubscriptionId`] and is removed independently.
    pub fn subscribe_handler(&self, name: impl Into<String>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::new();
        let name = name.into();
        tracing::trace!(event = %name, subscription = %id, "subscribe");
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one registration. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, name: &str, id: SubscriptionId) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let Some(handlers) = channels.get_mut(name) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            channels.remove(name);
        }
        removed
    }

    /// Deliver `event` to the handlers subscribed to its name.
    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<EventHandler> = {
            let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
            match channels.get(&event.name) {
                Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };
        tracing::trace!(event = %event.name, handlers = snapshot.len(), "emit");
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of registrations for `name`.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventBus")
            .field("channels", &channels.keys().collect::<Vec<_>>())
            .finish()
    }
}
