//! Action: one step of a rule's effect sequence.

use serde::{Deserialize, Serialize};

/// An operation executed once the rule fired and its conditions held.
///
/// Unrecognised `type` tags deserialize to [`Action::Unknown`], which the
/// interpreter skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Hand `data` to the external service executor under `service`.
    ServiceCall {
        service: String,
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Suspend this action sequence for `ms` milliseconds.
    WaitDuration { ms: u64 },
    /// Run the nested actions `count` times, one after another.
    RepeatCount {
        count: u32,
        #[serde(default)]
        actions: Vec<Action>,
    },
    /// Halt the running action sequence.
    Stop,
    /// Any action type this dispatcher does not understand.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceCall { service, .. } => write!(f, "service_call({service})"),
            Self::WaitDuration { ms } => write!(f, "wait_duration({ms}ms)"),
            Self::RepeatCount { count, actions } => {
                write!(f, "repeat_count({count}x, {} actions)", actions.len())
            }
            Self::Stop => f.write_str("stop"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
