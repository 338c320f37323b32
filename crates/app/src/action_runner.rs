//! Action runner: interprets a rule's action tree.
//!
//! One call to [`ActionRunner::run`] is one *run*. A run owns a halted flag,
//! set by a `stop` action or by cancellation and checked before every action
//! at every nesting level. Each run starts with the flag clear.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tripwire_domain::rule::Action;

use crate::entity_store::EntityStore;
use crate::ports::ServiceExecutor;

/// Cooperative cancellation signal for a run.
///
/// Cancelling makes the interpreter halt at its next check and cuts any
/// pending wait short. Cloning yields a handle to the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this only returns once cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// What a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Service calls handed to the executor, failed ones included.
    pub service_calls: usize,
    /// Iterations started by `repeat_count` actions, at every level.
    pub repeat_iterations: usize,
    /// Whether the run ended before reaching the end of its actions.
    pub halted: bool,
    /// Whether the halt was caused by cancellation.
    pub cancelled: bool,
}

struct RunContext {
    store: EntityStore,
    cancel: CancelToken,
    summary: RunSummary,
}

impl RunContext {
    fn should_halt(&mut self) -> bool {
        if !self.summary.halted && self.cancel.is_cancelled() {
            self.summary.halted = true;
            self.summary.cancelled = true;
        }
        self.summary.halted
    }
}

type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Sequential interpreter for action lists.
#[derive(Debug)]
pub struct ActionRunner<S> {
    executor: S,
}

impl<S: ServiceExecutor> ActionRunner<S> {
    pub fn new(executor: S) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &S {
        &self.executor
    }

    /// Execute `actions` in order.
    ///
    /// - `service_call` awaits the executor; a failure is logged and the run
    ///   continues.
    /// - `wait_duration` sleeps without blocking anything but this run.
    /// - `repeat_count` runs its nested list `count` times. After a `stop`,
    ///   the remaining iterations still start but each finds the run halted
    ///   and does nothing.
    /// - `stop` halts the whole run, not only the innermost list.
    /// - unknown actions are skipped.
    pub async fn run(&self, actions: &[Action], store: &EntityStore, cancel: &CancelToken) -> RunSummary {
        let mut ctx = RunContext {
            store: store.clone(),
            cancel: cancel.clone(),
            summary: RunSummary::default(),
        };
        self.run_list(actions, &mut ctx).await;
        ctx.summary
    }

    fn run_list<'a>(&'a self, actions: &'a [Action], ctx: &'a mut RunContext) -> BoxFuture<'a> {
        Box::pin(async move {
            for action in actions {
                if ctx.should_halt() {
                    return;
                }
                self.run_action(action, ctx).await;
            }
        })
    }

    async fn run_action(&self, action: &Action, ctx: &mut RunContext) {
        match action {
            Action::ServiceCall { service, data } => {
                ctx.summary.service_calls += 1;
                tracing::debug!(%service, "service call");
                if let Err(err) = self.executor.execute(service, data, &ctx.store).await {
                    let source = &err.source;
                    tracing::warn!(%service, error = %source, "service call failed");
                }
            }
            Action::WaitDuration { ms } => {
                let cancel = ctx.cancel.clone();
                let interrupted = tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(*ms)) => false,
                    () = cancel.cancelled() => true,
                };
                if interrupted {
                    tracing::debug!(ms, "wait interrupted by cancellation");
                    ctx.should_halt();
                }
            }
            Action::RepeatCount { count, actions } => {
                for _ in 0..*count {
                    ctx.summary.repeat_iterations += 1;
                    self.run_list(actions, ctx).await;
                }
            }
            Action::Stop => {
                tracing::debug!("stop");
                ctx.summary.halted = true;
            }
            Action::Unknown => {
                tracing::trace!("skipping unknown action");
            }
        }
    }
}
