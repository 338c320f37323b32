//! # tripwire-app
//!
//! Application layer: the in-process dispatcher and its **port definitions**.
//!
//! ## Responsibilities
//! - Deliver named events to subscribers ([`event_bus::EventBus`])
//! - Hold numeric and string entity state and notify on writes
//!   ([`entity_store::EntityStore`])
//! - Drive repeating timers ([`timer::TimerService`]) and ordered event
//!   patterns ([`pattern::PatternSequenceWatcher`])
//! - Evaluate conditions and run action sequences
//!   ([`conditions`], [`action_runner::ActionRunner`])
//! - Tie all of the above to declarative rules ([`rule_engine::RuleEngine`])
//! - Define the outbound **port trait** for service calls
//!   ([`ports::ServiceExecutor`])
//!
//! ## Dependency rule
//! Depends on `tripwire-domain` only (plus `tokio` for timers and tasks).
//! Never imports the daemon. Binaries depend on *this* crate, not the reverse.

pub mod action_runner;
pub mod conditions;
pub mod entity_store;
pub mod event_bus;
pub mod pattern;
pub mod ports;
pub mod rule_engine;
pub mod timer;

#[cfg(test)]
mod test_support;
