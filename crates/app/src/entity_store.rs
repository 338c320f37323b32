//! Entity store: keyed numeric and string values with change notification.
//!
//! This is the only state shared between the dispatcher and the host
//! application: input adapters and services write values, conditions read
//! them, and numeric-threshold triggers listen for writes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tripwire_domain::id::ListenerId;

/// Called with `(key, value)` after every numeric write.
pub type NumericListener = Arc<dyn Fn(&str, f64) + Send + Sync>;

/// Called with `(key, value)` after every string write.
pub type StringListener = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
struct Inner {
    numbers: RwLock<HashMap<String, f64>>,
    strings: RwLock<HashMap<String, String>>,
    numeric_listeners: RwLock<Vec<(ListenerId, NumericListener)>>,
    string_listeners: RwLock<Vec<(ListenerId, StringListener)>>,
}

/// Shared, thread-safe value store.
///
/// Numeric and string values live in separate namespaces: `set_numeric("hp", …)`
/// and `set_string("hp", …)` do not interfere. Every write overwrites and
/// notifies, even when the value is unchanged. Values are never removed.
///
/// Listeners run synchronously on the writer's thread once the write is
/// visible, over a snapshot of the registered listeners, with no store lock
/// held; they may read or write the store themselves.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone, Default)]
pub struct EntityStore {
    inner: Arc<Inner>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_numeric(&self, key: impl Into<String>, value: f64) {
        let key = key.into();
        self.inner
            .numbers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), value);
        tracing::trace!(%key, value, "numeric entity set");

        let listeners: Vec<NumericListener> = self
            .inner
            .numeric_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&key, value);
        }
    }

    pub fn set_string(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.inner
            .strings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), value.clone());
        tracing::trace!(%key, %value, "string entity set");

        let listeners: Vec<StringListener> = self
            .inner
            .string_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&key, &value);
        }
    }

    #[must_use]
    pub fn try_get_numeric(&self, key: &str) -> Option<f64> {
        self.inner
            .numbers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    #[must_use]
    pub fn try_get_string(&self, key: &str) -> Option<String> {
        self.inner
            .strings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Numeric value of `key`, `0.0` when it was never set.
    #[must_use]
    pub fn numeric_or_zero(&self, key: &str) -> f64 {
        self.try_get_numeric(key).unwrap_or(0.0)
    }

    /// String value of `key`, empty when it was never set.
    #[must_use]
    pub fn string_or_empty(&self, key: &str) -> String {
        self.try_get_string(key).unwrap_or_default()
    }

    /// Listen for every numeric write.
    pub fn on_numeric_changed(
        &self,
        listener: impl Fn(&str, f64) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId::new();
        self.inner
            .numeric_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Listen for every string write.
    pub fn on_string_changed(
        &self,
        listener: impl Fn(&str, &str) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId::new();
        self.inner
            .string_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a numeric or string listener. Returns `false` if unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut numeric = self
            .inner
            .numeric_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = numeric.len();
        numeric.retain(|(existing, _)| *existing != id);
        if numeric.len() != before {
            return true;
        }
        drop(numeric);

        let mut string = self
            .inner
            .string_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = string.len();
        string.retain(|(existing, _)| *existing != id);
        string.len() != before
    }

    /// Total number of registered listeners, numeric and string.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let numeric = self
            .inner
            .numeric_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let string = self
            .inner
            .string_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        numeric + string
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = self.inner.numbers.read().unwrap_or_else(PoisonError::into_inner);
        let strings = self.inner.strings.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EntityStore")
            .field("numbers", &*numbers)
            .field("strings", &*strings)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
