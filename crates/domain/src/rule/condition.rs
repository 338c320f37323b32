//! Condition: a guard that must hold for the rule's actions to run.

use serde::{Deserialize, Serialize};

use super::NumericBounds;

/// A side-effect-free predicate over the entity store.
///
/// All conditions of a rule must hold (logical AND). Unrecognised `type`
/// tags deserialize to [`Condition::Unknown`], which is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Requires a string entity to equal `value`. A missing entity reads as `""`.
    StateEquals { entity: String, value: String },
    /// Requires the current value of a numeric entity to lie inside the bounds.
    /// A missing entity reads as `0`.
    NumericCompare {
        entity: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        above: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        below: Option<f64>,
    },
    /// Any condition type this dispatcher does not understand.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateEquals { entity, value } => write!(f, "state_equals({entity}, {value})"),
            Self::NumericCompare {
                entity,
                above,
                below,
            } => write!(
                f,
                "numeric_compare({entity}, {})",
                NumericBounds::new(*above, *below)
            ),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
