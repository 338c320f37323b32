//! # tripwired: tripwire daemon
//!
//! Composition root that wires the dispatcher together and feeds it.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Load rule definitions from JSON and register them with the engine
//! - Read console commands from stdin on a dedicated thread
//! - Dispose every rule on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on every other crate.
//! It is the wiring layer; no dispatcher logic belongs here.

mod config;
mod console;
mod executor;

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tripwire_app::entity_store::EntityStore;
use tripwire_app::event_bus::EventBus;
use tripwire_app::rule_engine::RuleEngine;
use tripwire_domain::rule::{Rule, parse_rules};

use crate::config::Config;
use crate::executor::LoggingServiceExecutor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Dispatcher
    let bus = EventBus::new();
    let store = EntityStore::new();
    let engine = RuleEngine::new(bus.clone(), store.clone(), LoggingServiceExecutor);

    // Rules
    let rules = load_rules(config.rules_path())?;
    let ids = engine.register_all(rules);
    tracing::info!(rules = ids.len(), "tripwired started");

    // Console
    if config.console.enabled {
        std::thread::Builder::new()
            .name("console".to_string())
            .spawn(move || {
                if let Err(err) = console::run(std::io::stdin().lock(), &bus, &store) {
                    tracing::error!(error = %err, "console input failed");
                }
            })?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    engine.dispose_all();

    Ok(())
}

/// Read rule definitions. A missing file starts the daemon without rules.
fn load_rules(path: &Path) -> Result<Vec<Rule>, Box<dyn std::error::Error>> {
    match std::fs::read_to_string(path) {
        Ok(json) => Ok(parse_rules(&json)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "rules file not found, starting without rules");
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}
