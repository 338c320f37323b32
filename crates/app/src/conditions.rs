//! Condition evaluation against the entity store.

use tripwire_domain::rule::{Condition, NumericBounds};

use crate::entity_store::EntityStore;

/// Read-only view of entity state used by conditions.
pub trait StateReader {
    /// Numeric value of `key`, `0.0` when absent.
    fn numeric_or_zero(&self, key: &str) -> f64;

    /// String value of `key`, empty when absent.
    fn string_or_empty(&self, key: &str) -> String;
}

impl StateReader for EntityStore {
    fn numeric_or_zero(&self, key: &str) -> f64 {
        EntityStore::numeric_or_zero(self, key)
    }

    fn string_or_empty(&self, key: &str) -> String {
        EntityStore::string_or_empty(self, key)
    }
}

/// Evaluate all conditions (logical AND). Returns `true` if empty.
///
/// Stops at the first condition that does not hold. Missing numeric
/// entities read as `0`, missing string entities as `""`. Unknown
/// conditions are skipped.
#[must_use]
pub fn evaluate<R: StateReader + ?Sized>(conditions: &[Condition], store: &R) -> bool {
    conditions
        .iter()
        .all(|condition| evaluate_condition(condition, store))
}

/// Evaluate a single condition.
#[must_use]
pub fn evaluate_condition<R: StateReader + ?Sized>(condition: &Condition, store: &R) -> bool {
    match condition {
        Condition::StateEquals { entity, value } => store.string_or_empty(entity) == *value,
        Condition::NumericCompare {
            entity,
            above,
            below,
        } => NumericBounds::new(*above, *below).contains(store.numeric_or_zero(entity)),
        Condition::Unknown => {
            tracing::trace!("skipping unknown condition");
            true
        }
    }
}
