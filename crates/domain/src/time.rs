//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp carried by every [`Event`](crate::event::Event).
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whether `end` happened no later than `window_ms` milliseconds after `start`.
///
/// An `end` earlier than `start` counts as inside the window.
#[must_use]
pub fn within_window(start: Timestamp, end: Timestamp, window_ms: u64) -> bool {
    let window = i64::try_from(window_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX);
    end - start <= window
}
