//! Timer service: fixed-interval repeating callbacks on the tokio runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Spawns repeating timers on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TimerService {
    runtime: Handle,
}

impl TimerService {
    /// Create a service spawning its timers on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Create a service bound to the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Invoke `callback` every `interval` until the returned handle is
    /// cancelled or dropped.
    ///
    /// The first call happens one full interval after registration. A tick
    /// that could not run on time is delayed rather than replayed in a burst.
    /// A zero interval is refused: the handle is returned inactive.
    pub fn register(
        &self,
        interval: Duration,
        callback: impl Fn() + Send + 'static,
    ) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        if interval.is_zero() {
            tracing::warn!("refusing to schedule a timer with a zero interval");
            cancelled.store(true, Ordering::Release);
            return TimerHandle {
                cancelled,
                task: None,
            };
        }

        let flag = Arc::clone(&cancelled);
        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                callback();
            }
        });
        tracing::debug!(interval_ms = interval.as_millis(), "timer scheduled");

        TimerHandle {
            cancelled,
            task: Some(task),
        }
    }
}

/// Cancellation handle of one repeating timer.
///
/// Once [`cancel`](Self::cancel) returns no new callback starts; a callback
/// already running completes. Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Stop the timer. Calling it again has no effect.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!("timer cancelled");
        }
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Whether the timer still schedules callbacks.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
