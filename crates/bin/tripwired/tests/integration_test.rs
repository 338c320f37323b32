//! End-to-end tests for the dispatcher as the daemon wires it.
//!
//! Each test parses JSON rule definitions, registers them with a real engine
//! (real bus, real store, real timers) and records service calls with a spy
//! executor. Time is paused so waits and timers run instantly.

use std::sync::Mutex;
use std::time::Duration;

use chrono::TimeDelta;
use serde_json::{Value, json};
use tripwire_app::entity_store::EntityStore;
use tripwire_app::event_bus::EventBus;
use tripwire_app::ports::ServiceExecutor;
use tripwire_app::rule_engine::RuleEngine;
use tripwire_domain::error::ServiceError;
use tripwire_domain::event::Event;
use tripwire_domain::id::RuleId;
use tripwire_domain::rule::parse_rules;
use tripwire_domain::time::now;

#[derive(Default)]
struct Spy {
    calls: Mutex<Vec<(String, Value)>>,
}

impl Spy {
    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ServiceExecutor for Spy {
    async fn execute(
        &self,
        service: &str,
        data: &Value,
        store: &EntityStore,
    ) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((service.to_string(), data.clone()));
        if service == "store.set_string"
            && let (Some(entity), Some(value)) = (data["entity"].as_str(), data["value"].as_str())
        {
            store.set_string(entity, value);
        }
        Ok(())
    }
}

/// Build an engine with the given JSON rules registered.
fn engine(json: &str) -> RuleEngine<Spy> {
    let rules = parse_rules(json).expect("rule definitions should parse");
    let engine = RuleEngine::new(EventBus::new(), EntityStore::new(), Spy::default());
    engine.register_all(rules);
    engine
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_play_beep_on_click() {
    let engine = engine(
        r#"{
            "id": "beep",
            "triggers": [{"type": "event", "name": "click"}],
            "actions": [{"type": "service_call", "service": "audio.play", "data": {"clip": "beep"}}]
        }"#,
    );

    engine.bus().emit(&Event::new("click"));
    advance(1).await;

    assert_eq!(
        engine.executor().calls(),
        vec![("audio.play".to_string(), json!({"clip": "beep"}))]
    );
}

#[tokio::test(start_paused = true)]
async fn should_fire_combo_only_when_completed_in_time() {
    let engine = engine(
        r#"[{
            "id": "combo",
            "triggers": [{"type": "pattern_sequence", "sequence": ["a", "b"], "withinMs": 200}],
            "actions": [{"type": "service_call", "service": "combo.hit"}]
        }]"#,
    );

    // Matching uses event timestamps, not the runtime clock.
    let t0 = now();
    engine.bus().emit(&Event::at("a", t0));
    engine.bus().emit(&Event::at("b", t0 + TimeDelta::milliseconds(300)));
    advance(1).await;
    assert!(engine.executor().calls().is_empty());

    let t1 = t0 + TimeDelta::seconds(1);
    engine.bus().emit(&Event::at("a", t1));
    engine.bus().emit(&Event::at("b", t1 + TimeDelta::milliseconds(100)));
    advance(1).await;
    assert_eq!(engine.executor().calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn should_raise_alarm_once_when_health_drops_below_threshold() {
    let engine = engine(
        r#"{
            "id": "low-health",
            "triggers": [{"type": "numeric_threshold", "entity": "health", "below": 30}],
            "actions": [{"type": "service_call", "service": "ui.alarm"}]
        }"#,
    );

    engine.store().set_numeric("health", 40.0);
    advance(1).await;
    engine.store().set_numeric("health", 20.0);
    advance(1).await;

    assert_eq!(engine.executor().calls().len(), 1);
}

// ---------------------------------------------------------------------------
// Composite behaviour
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn should_chain_rules_through_entity_state() {
    let engine = engine(
        r#"[
            {
                "id": "arm",
                "triggers": [{"type": "event", "name": "arm"}],
                "actions": [{"type": "service_call", "service": "store.set_string",
                             "data": {"entity": "alarm", "value": "armed"}}]
            },
            {
                "id": "intruder",
                "triggers": [{"type": "event", "name": "door"}],
                "conditions": [{"type": "state_equals", "entity": "alarm", "value": "armed"}],
                "actions": [{"type": "service_call", "service": "siren.on"}]
            }
        ]"#,
    );

    engine.bus().emit(&Event::new("door"));
    advance(1).await;
    engine.bus().emit(&Event::new("arm"));
    advance(1).await;
    engine.bus().emit(&Event::new("door"));
    advance(1).await;

    let services: Vec<String> = engine.executor().calls().into_iter().map(|(s, _)| s).collect();
    assert_eq!(services, vec!["store.set_string", "siren.on"]);
}

#[tokio::test(start_paused = true)]
async fn should_interpret_repeat_wait_and_stop() {
    let engine = engine(
        r#"{
            "id": "blink",
            "triggers": [{"type": "event", "name": "go"}],
            "actions": [
                {"type": "repeat_count", "count": 3, "actions": [
                    {"type": "service_call", "service": "light.on"},
                    {"type": "wait_duration", "ms": 100},
                    {"type": "service_call", "service": "light.off"}
                ]},
                {"type": "stop"},
                {"type": "service_call", "service": "never"}
            ]
        }"#,
    );

    engine.bus().emit(&Event::new("go"));
    advance(150).await;
    assert_eq!(engine.executor().calls().len(), 3);
    assert!(engine.is_running(&RuleId::from("blink")));

    advance(500).await;
    assert_eq!(engine.executor().calls().len(), 6);
    assert!(!engine.is_running(&RuleId::from("blink")));
}

#[tokio::test(start_paused = true)]
async fn should_tick_until_disposed() {
    let engine = engine(
        r#"{
            "id": "tick",
            "triggers": [{"type": "time_schedule", "intervalMs": 1000}],
            "actions": [{"type": "service_call", "service": "clock.tick"}]
        }"#,
    );

    advance(2_500).await;
    assert_eq!(engine.executor().calls().len(), 2);

    engine.dispose_all();
    advance(5_000).await;
    assert_eq!(engine.executor().calls().len(), 2);
    assert!(engine.rule_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_ignore_unknown_entries_in_definitions() {
    let engine = engine(
        r#"{
            "id": "future",
            "triggers": [{"type": "gamepad_button", "button": 3}, {"type": "event", "name": "go"}],
            "conditions": [{"type": "moon_phase", "phase": "full"}],
            "actions": [{"type": "teleport"}, {"type": "service_call", "service": "ok"}]
        }"#,
    );

    engine.bus().emit(&Event::new("go"));
    advance(1).await;

    assert_eq!(engine.executor().calls(), vec![("ok".to_string(), Value::Null)]);
}

#[tokio::test(start_paused = true)]
async fn should_keep_running_valid_rules_when_a_sibling_is_malformed() {
    let engine = engine(
        r#"[
            {
                "id": "beep",
                "triggers": [{"type": "event", "name": "click"}],
                "actions": [{"type": "service_call", "service": "audio.play"}]
            },
            {
                "id": "broken",
                "triggers": [{"type": "numeric_threshold", "below": 30}],
                "actions": [{"type": "service_call", "service": "never"}]
            }
        ]"#,
    );

    engine.bus().emit(&Event::new("click"));
    advance(1).await;

    assert_eq!(engine.rule_ids(), vec![RuleId::from("beep")]);
    assert_eq!(engine.executor().calls().len(), 1);
}
