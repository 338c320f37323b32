//! Console input adapter: one command per stdin line.
//!
//! ```text
//! emit <name> [json]   emit an event, optionally with a JSON payload
//! set <key> <number>   write a numeric entity (finite numbers only)
//! set <key> <text>     write a string entity (rest of the line)
//! get <key>            print both values of an entity
//! ```
//!
//! Runs on its own thread; emission and store writes are synchronous and the
//! rule engine spawns runs on the tokio runtime.

use std::io::BufRead;

use tripwire_app::entity_store::EntityStore;
use tripwire_app::event_bus::EventBus;
use tripwire_domain::event::Event;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Emit(String, serde_json::Value),
    SetNumeric(String, f64),
    SetString(String, String),
    Get(String),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty line")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("payload is not valid JSON: {0}")]
    InvalidPayload(String),
}

/// Parse one console line.
///
/// # Errors
///
/// Returns an error for blank lines, unknown verbs and missing arguments.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();
    match verb {
        "" => Err(CommandError::Empty),
        "emit" => {
            let name = first_word(rest, "event name")?;
            let payload = rest[name.len()..].trim();
            let data = if payload.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_str(payload)
                    .map_err(|err| CommandError::InvalidPayload(err.to_string()))?
            };
            Ok(Command::Emit(name, data))
        }
        "get" => first_word(rest, "entity key").map(Command::Get),
        "set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument("value"))?;
            let value = value.trim();
            Ok(match value.parse::<f64>() {
                Ok(number) if number.is_finite() => Command::SetNumeric(key.to_string(), number),
                _ => Command::SetString(key.to_string(), value.to_string()),
            })
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn first_word(rest: &str, what: &'static str) -> Result<String, CommandError> {
    rest.split_whitespace()
        .next()
        .map(ToString::to_string)
        .ok_or(CommandError::MissingArgument(what))
}

/// Apply a command. Returns the text to print, if any.
pub fn apply(command: Command, bus: &EventBus, store: &EntityStore) -> Option<String> {
    match command {
        Command::Emit(name, data) => {
            bus.emit(&Event::new(name).with_data(data));
            None
        }
        Command::SetNumeric(key, value) => {
            store.set_numeric(key, value);
            None
        }
        Command::SetString(key, value) => {
            store.set_string(key, value);
            None
        }
        Command::Get(key) => Some(format!(
            "{key}: numeric={} string={:?}",
            store.numeric_or_zero(&key),
            store.string_or_empty(&key)
        )),
    }
}

/// Read commands until end of input. Bad lines are logged and skipped.
///
/// # Errors
///
/// Returns an error if reading from `reader` fails.
pub fn run(reader: impl BufRead, bus: &EventBus, store: &EntityStore) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        match parse(&line) {
            Ok(command) => {
                if let Some(output) = apply(command, bus, store) {
                    println!("{output}");
                }
            }
            Err(CommandError::Empty) => {}
            Err(err) => tracing::warn!(%line, error = %err, "ignoring console line"),
        }
    }
    tracing::info!("console input closed");
    Ok(())
}
