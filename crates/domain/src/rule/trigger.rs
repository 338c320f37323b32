//! Trigger: what proposes a rule for firing.

use serde::{Deserialize, Serialize};

use super::NumericBounds;

/// Describes which event or state change should fire a rule.
///
/// Rule definitions tag each trigger with a `type` string. Tags this crate
/// does not know deserialize to [`Trigger::Unknown`], which never fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when an event with this name is emitted.
    Event { name: String },
    /// Fires when a numeric entity is written with a value inside the bounds.
    NumericThreshold {
        entity: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        above: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        below: Option<f64>,
    },
    /// Fires on every tick of a repeating timer.
    TimeSchedule {
        #[serde(alias = "intervalMs")]
        interval_ms: u64,
    },
    /// Fires when the named events arrive in order within the window.
    PatternSequence {
        sequence: Vec<String>,
        #[serde(alias = "withinMs")]
        within_ms: u64,
    },
    /// Any trigger type this dispatcher does not understand.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event { name } => write!(f, "event({name})"),
            Self::NumericThreshold {
                entity,
                above,
                below,
            } => write!(
                f,
                "numeric_threshold({entity}, {})",
                NumericBounds::new(*above, *below)
            ),
            Self::TimeSchedule { interval_ms } => write!(f, "time_schedule({interval_ms}ms)"),
            Self::PatternSequence {
                sequence,
                within_ms,
            } => write!(
                f,
                "pattern_sequence({} within {within_ms}ms)",
                sequence.join(" → ")
            ),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
