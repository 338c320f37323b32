//! Event: a named, timestamped notification travelling over the bus.

use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, now};

/// A fire-and-forget notification.
///
/// Only `name` is used for routing. `data` is an opaque payload that
/// subscribers may inspect; the dispatcher never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::at(name, now())
    }

    /// Create an event with an explicit timestamp (replay, tests).
    #[must_use]
    pub fn at(name: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            name: name.into(),
            timestamp,
            data: serde_json::Value::Null,
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}
