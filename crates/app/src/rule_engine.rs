//! Rule engine: wires rule triggers to the dispatcher and runs actions.
//!
//! Registering a rule installs one subscription per trigger (bus handler,
//! timer, store listener or pattern watcher). Each of them calls the rule's
//! *fire* routine: conditions are evaluated against the entity store and, if
//! they hold, the action sequence is spawned on the tokio runtime so the
//! triggering thread never waits for it.
//!
//! Overlapping firings of one rule follow its [`ExecutionMode`]. Disposing a
//! registration stops future firings; a run already in flight completes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tripwire_domain::id::{ListenerId, RuleId, RunId, SubscriptionId};
use tripwire_domain::rule::{ExecutionMode, NumericBounds, Rule, Trigger};

use crate::action_runner::{ActionRunner, CancelToken};
use crate::conditions;
use crate::entity_store::EntityStore;
use crate::event_bus::EventBus;
use crate::pattern::PatternSequenceWatcher;
use crate::ports::ServiceExecutor;
use crate::timer::{TimerHandle, TimerService};

struct Shared<S> {
    bus: EventBus,
    store: EntityStore,
    timers: TimerService,
    runner: ActionRunner<S>,
    runtime: Handle,
}

#[derive(Default)]
struct RunSlot {
    generation: u64,
    active: Option<CancelToken>,
    running: usize,
}

/// Per-rule state shared by every trigger of the rule.
struct RuleState {
    rule: Rule,
    disposed: AtomicBool,
    slot: Mutex<RunSlot>,
}

impl RuleState {
    /// Claim a run slot according to the execution mode.
    fn begin_run(&self) -> Option<(u64, CancelToken)> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match self.rule.mode {
            ExecutionMode::Single if slot.running > 0 => return None,
            ExecutionMode::Restart => {
                if let Some(previous) = slot.active.take() {
                    tracing::debug!(rule = %self.rule.id, "cancelling active run");
                    previous.cancel();
                }
            }
            _ => {}
        }
        slot.generation += 1;
        slot.running += 1;
        let cancel = CancelToken::new();
        slot.active = Some(cancel.clone());
        Some((slot.generation, cancel))
    }

    fn finish_run(&self, generation: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.running = slot.running.saturating_sub(1);
        if slot.generation == generation {
            slot.active = None;
        }
    }

    fn is_running(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
            > 0
    }
}

/// Releases the run slot when a run ends, even by panic.
struct RunGuard {
    state: Arc<RuleState>,
    generation: u64,
    run_id: RunId,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(rule = %self.state.rule.id, run = %self.run_id, "run panicked");
        }
        self.state.finish_run(self.generation);
    }
}

/// Evaluate the rule's conditions and, if they hold, spawn a run.
fn fire<S: ServiceExecutor + 'static>(shared: &Arc<Shared<S>>, state: &Arc<RuleState>) {
    let rule_id = &state.rule.id;
    if state.disposed.load(Ordering::Acquire) {
        return;
    }
    if !conditions::evaluate(&state.rule.conditions, &shared.store) {
        tracing::debug!(rule = %rule_id, "conditions not met");
        return;
    }
    let Some((generation, cancel)) = state.begin_run() else {
        tracing::debug!(rule = %rule_id, "rule already running, firing dropped");
        return;
    };

    let run_id = RunId::new();
    tracing::debug!(rule = %rule_id, run = %run_id, "rule fired");
    let task_shared = Arc::clone(shared);
    let guard = RunGuard {
        state: Arc::clone(state),
        generation,
        run_id,
    };
    shared.runtime.spawn(async move {
        let summary = task_shared
            .runner
            .run(&guard.state.rule.actions, &task_shared.store, &cancel)
            .await;
        tracing::debug!(
            rule = %guard.state.rule.id,
            run = %guard.run_id,
            service_calls = summary.service_calls,
            halted = summary.halted,
            cancelled = summary.cancelled,
            "run finished"
        );
        drop(guard);
    });
}

/// One subscription installed on behalf of a rule.
enum Subscription {
    Event { name: String, id: SubscriptionId },
    Timer(TimerHandle),
    Threshold(ListenerId),
    Pattern(PatternSequenceWatcher),
}

/// Everything a registered rule installed. Dropping it disposes it.
struct RuleRegistration {
    state: Arc<RuleState>,
    bus: EventBus,
    store: EntityStore,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl RuleRegistration {
    /// Remove every subscription. Calling it again has no effect.
    fn dispose(&self) {
        self.state.disposed.store(true, Ordering::Release);
        let subscriptions =
            std::mem::take(&mut *self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner));
        if subscriptions.is_empty() {
            return;
        }
        for subscription in subscriptions {
            match subscription {
                Subscription::Event { name, id } => {
                    self.bus.unsubscribe(&name, id);
                }
                Subscription::Timer(handle) => handle.cancel(),
                Subscription::Threshold(id) => {
                    self.store.remove_listener(id);
                }
                Subscription::Pattern(watcher) => watcher.dispose(),
            }
        }
        tracing::info!(rule = %self.state.rule.id, "rule disposed");
    }
}

impl Drop for RuleRegistration {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Registers rules and owns the lifecycle of their subscriptions.
pub struct RuleEngine<S> {
    shared: Arc<Shared<S>>,
    registrations: Mutex<HashMap<RuleId, RuleRegistration>>,
}

impl<S> RuleEngine<S>
where
    S: ServiceExecutor + 'static,
{
    /// Create an engine spawning timers and runs on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[must_use]
    pub fn new(bus: EventBus, store: EntityStore, executor: S) -> Self {
        Self::with_runtime(bus, store, executor, Handle::current())
    }

    /// Create an engine spawning timers and runs on `runtime`.
    #[must_use]
    pub fn with_runtime(bus: EventBus, store: EntityStore, executor: S, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                bus,
                store,
                timers: TimerService::new(runtime.clone()),
                runner: ActionRunner::new(executor),
                runtime,
            }),
            registrations: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.shared.store
    }

    #[must_use]
    pub fn executor(&self) -> &S {
        self.shared.runner.executor()
    }

    /// Install the rule's triggers.
    ///
    /// A rule registered under an id already in use replaces the previous
    /// one, which is disposed first. A disabled rule only disposes its
    /// predecessor. Triggers of unknown type are skipped.
    #[tracing::instrument(skip(self, rule), fields(rule = %rule.id, mode = %rule.mode))]
    pub fn register(&self, rule: Rule) -> RuleId {
        let id = rule.id.clone();
        if self.unregister(&id) {
            tracing::info!("replacing existing rule");
        }
        if !rule.enabled {
            tracing::info!("rule disabled, not registered");
            return id;
        }

        let state = Arc::new(RuleState {
            rule,
            disposed: AtomicBool::new(false),
            slot: Mutex::new(RunSlot::default()),
        });
        let subscriptions: Vec<Subscription> = state
            .rule
            .triggers
            .iter()
            .filter_map(|trigger| self.wire(trigger, &state))
            .collect();
        tracing::info!(subscriptions = subscriptions.len(), "rule registered");

        let registration = RuleRegistration {
            state,
            bus: self.shared.bus.clone(),
            store: self.shared.store.clone(),
            subscriptions: Mutex::new(subscriptions),
        };
        let previous = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), registration);
        // A concurrent register of the same id may have slipped in.
        drop(previous);
        id
    }

    /// Register every rule, returning their ids in order.
    pub fn register_all(&self, rules: impl IntoIterator<Item = Rule>) -> Vec<RuleId> {
        rules.into_iter().map(|rule| self.register(rule)).collect()
    }

    /// Dispose the rule's subscriptions. Returns `false` if it was not registered.
    #[tracing::instrument(skip(self))]
    pub fn unregister(&self, id: &RuleId) -> bool {
        let removed = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match removed {
            Some(registration) => {
                registration.dispose();
                true
            }
            None => false,
        }
    }

    /// Dispose every registered rule.
    pub fn dispose_all(&self) {
        let drained: Vec<RuleRegistration> = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, registration)| registration)
            .collect();
        for registration in &drained {
            registration.dispose();
        }
    }

    /// Fire a rule by hand, as if one of its triggers matched.
    ///
    /// Conditions and the execution mode still apply. Returns `false` if no
    /// rule with this id is registered.
    pub fn trigger(&self, id: &RuleId) -> bool {
        let state = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|registration| Arc::clone(&registration.state));
        match state {
            Some(state) => {
                fire(&self.shared, &state);
                true
            }
            None => false,
        }
    }

    /// Ids of the registered rules, sorted.
    #[must_use]
    pub fn rule_ids(&self) -> Vec<RuleId> {
        let mut ids: Vec<RuleId> = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Whether a run of the rule is in flight.
    #[must_use]
    pub fn is_running(&self, id: &RuleId) -> bool {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some_and(|registration| registration.state.is_running())
    }

    fn wire(&self, trigger: &Trigger, state: &Arc<RuleState>) -> Option<Subscription> {
        let shared = Arc::clone(&self.shared);
        let rule_state = Arc::clone(state);
        let fire_rule = move || fire(&shared, &rule_state);
        tracing::debug!(%trigger, "wiring trigger");

        match trigger {
            Trigger::Event { name } => {
                let id = self.shared.bus.subscribe(name.clone(), move |_| fire_rule());
                Some(Subscription::Event {
                    name: name.clone(),
                    id,
                })
            }
            Trigger::NumericThreshold {
                entity,
                above,
                below,
            } => {
                let entity = entity.clone();
                let bounds = NumericBounds::new(*above, *below);
                let id = self.shared.store.on_numeric_changed(move |key, value| {
                    if key == entity && bounds.contains(value) {
                        fire_rule();
                    }
                });
                Some(Subscription::Threshold(id))
            }
            Trigger::TimeSchedule { interval_ms } => {
                let handle = self
                    .shared
                    .timers
                    .register(Duration::from_millis(*interval_ms), fire_rule);
                Some(Subscription::Timer(handle))
            }
            Trigger::PatternSequence {
                sequence,
                within_ms,
            } => Some(Subscription::Pattern(PatternSequenceWatcher::new(
                &self.shared.bus,
                sequence.clone(),
                *within_ms,
                fire_rule,
            ))),
            Trigger::Unknown => {
                tracing::debug!(rule = %state.rule.id, "skipping unknown trigger");
                None
            }
        }
    }
}

impl<S> std::fmt::Debug for RuleEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registrations = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RuleEngine")
            .field("rules", &registrations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
