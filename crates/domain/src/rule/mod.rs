//! Rule: trigger → condition → action definitions.
//!
//! A [`Rule`] is handed to the dispatcher once. Each of its [`Trigger`]s
//! proposes the rule for firing; all [`Condition`]s must then hold for the
//! [`Action`] sequence to run. How overlapping firings of one rule are
//! handled is governed by its [`ExecutionMode`].

mod action;
mod bounds;
mod condition;
mod trigger;

pub use action::Action;
pub use bounds::NumericBounds;
pub use condition::Condition;
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

use crate::error::TripwireError;
use crate::id::RuleId;

/// What happens when a rule fires while a previous run is still active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Drop the new firing.
    #[default]
    Single,
    /// Cancel the active run, then start a new one.
    Restart,
    /// Start a new run alongside the active ones.
    Parallel,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Restart => f.write_str("restart"),
            Self::Parallel => f.write_str("parallel"),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// A rule as authored externally.
///
/// No validation happens here: a rule without triggers simply never fires,
/// and a rule without actions fires without effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Rule {
    /// Create a builder for a rule named `id`.
    #[must_use]
    pub fn builder(id: impl Into<RuleId>) -> RuleBuilder {
        RuleBuilder {
            rule: Self {
                id: id.into(),
                mode: ExecutionMode::default(),
                enabled: true,
                triggers: Vec::new(),
                conditions: Vec::new(),
                actions: Vec::new(),
            },
        }
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug)]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    #[must_use]
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.rule.mode = mode;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.rule.enabled = enabled;
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.rule.triggers.push(trigger);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.rule.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.rule.actions.push(action);
        self
    }

    #[must_use]
    pub fn build(self) -> Rule {
        self.rule
    }
}

/// Parse rule definitions from JSON.
///
/// Accepts either a single rule object or an array of rules. Unknown
/// trigger, condition and action types are kept as `Unknown` entries.
/// An entry that does not form a rule (missing `id`, a known type with
/// missing or mistyped fields) is logged and skipped; its siblings are kept.
///
/// # Errors
///
/// Returns [`TripwireError::Definition`] when the document is not valid JSON.
pub fn parse_rules(json: &str) -> Result<Vec<Rule>, TripwireError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(TripwireError::Definition)?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        other => vec![other],
    };
    let rules = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let id = entry
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string);
            match serde_json::from_value::<Rule>(entry) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    tracing::warn!(
                        index,
                        rule = id.as_deref().unwrap_or("<no id>"),
                        error = %err,
                        "skipping malformed rule definition"
                    );
                    None
                }
            }
        })
        .collect();
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_rule() -> Rule {
        Rule::builder("click-beep")
            .trigger(Trigger::Event {
                name: "click".to_string(),
            })
            .action(Action::ServiceCall {
                service: "audio.play".to_string(),
                data: serde_json::json!({"clip": "beep"}),
            })
            .build()
    }

    #[test]
    fn should_build_rule_with_defaults() {
        let rule = click_rule();
        assert_eq!(rule.id, RuleId::new("click-beep"));
        assert_eq!(rule.mode, ExecutionMode::Single);
        assert!(rule.enabled);
        assert_eq!(rule.triggers.len(), 1);
        assert!(rule.conditions.is_empty());
        assert_eq!(rule.actions.len(), 1);
    }

    #[test]
    fn should_accumulate_conditions_and_actions() {
        let rule = Rule::builder("multi")
            .mode(ExecutionMode::Restart)
            .enabled(false)
            .condition(Condition::StateEquals {
                entity: "mode".to_string(),
                value: "day".to_string(),
            })
            .condition(Condition::Unknown)
            .action(Action::WaitDuration { ms: 10 })
            .action(Action::Stop)
            .build();
        assert_eq!(rule.mode, ExecutionMode::Restart);
        assert!(!rule.enabled);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.actions.len(), 2);
    }

    #[test]
    fn should_parse_single_rule_document() {
        let json = r#"{
            "id": "low-health",
            "mode": "restart",
            "triggers": [{"type": "numeric_threshold", "entity": "health", "below": 30}],
            "actions": [{"type": "service_call", "service": "ui.flash", "data": {"color": "red"}}]
        }"#;
        let rules = parse_rules(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].mode, ExecutionMode::Restart);
        assert!(rules[0].enabled);
        assert!(rules[0].conditions.is_empty());
    }

    #[test]
    fn should_parse_rule_array_with_unknown_entries() {
        let json = r#"[
            {"id": "a", "triggers": [{"type": "event", "name": "click"}]},
            {"id": "b", "enabled": false,
             "triggers": [{"type": "voice_command", "phrase": "go"}],
             "conditions": [{"type": "moon_phase"}],
             "actions": [{"type": "teleport"}]}
        ]"#;
        let rules = parse_rules(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(!rules[1].enabled);
        assert_eq!(rules[1].triggers, vec![Trigger::Unknown]);
        assert_eq!(rules[1].conditions, vec![Condition::Unknown]);
        assert_eq!(rules[1].actions, vec![Action::Unknown]);
    }

    #[test]
    fn should_skip_rule_without_id() {
        let rules = parse_rules(r#"{"triggers": []}"#).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn should_keep_valid_rules_next_to_malformed_ones() {
        let json = r#"[
            {"id": "good", "triggers": [{"type": "event", "name": "click"}]},
            {"id": "bad", "triggers": [{"type": "numeric_threshold", "below": 30}]},
            {"id": "negative", "actions": [{"type": "repeat_count", "count": -1}]},
            {"id": "mistyped", "triggers": [{"type": "numeric_threshold", "entity": "hp", "below": "low"}]},
            {"id": "also-good", "mode": "parallel"}
        ]"#;
        let rules = parse_rules(json).unwrap();
        let ids: Vec<&str> = rules.iter().map(|rule| rule.id.as_str()).collect();
        assert_eq!(ids, vec!["good", "also-good"]);
    }

    #[test]
    fn should_return_definition_error_for_invalid_json() {
        let result = parse_rules("not json");
        assert!(matches!(result, Err(TripwireError::Definition(_))));
    }

    #[test]
    fn should_roundtrip_rule_through_serde_json() {
        let rule = click_rule();
        let json = serde_json::to_string(&rule).unwrap();
        let parsed: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn should_display_execution_modes() {
        assert_eq!(ExecutionMode::Single.to_string(), "single");
        assert_eq!(ExecutionMode::Restart.to_string(), "restart");
        assert_eq!(ExecutionMode::Parallel.to_string(), "parallel");
    }
}
