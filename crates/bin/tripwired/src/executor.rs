//! Service executor used by the daemon.
//!
//! Two services are built in and write to the entity store so rules can
//! change state:
//!
//! - `store.set_numeric` with `{"entity": "...", "value": 1.5}`
//! - `store.set_string` with `{"entity": "...", "value": "..."}`
//!
//! Every other service is only logged.

use serde_json::Value;
use tripwire_app::entity_store::EntityStore;
use tripwire_app::ports::ServiceExecutor;
use tripwire_domain::error::ServiceError;

pub const SET_NUMERIC: &str = "store.set_numeric";
pub const SET_STRING: &str = "store.set_string";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("missing string field `entity`")]
    MissingEntity,
    #[error("field `value` must be a {0}")]
    InvalidValue(&'static str),
}

fn entity(data: &Value) -> Result<&str, PayloadError> {
    data.get("entity")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingEntity)
}

/// Logs every call and applies the built-in store services.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingServiceExecutor;

impl LoggingServiceExecutor {
    fn apply(service: &str, data: &Value, store: &EntityStore) -> Result<(), PayloadError> {
        match service {
            SET_NUMERIC => {
                let key = entity(data)?;
                let value = data
                    .get("value")
                    .and_then(Value::as_f64)
                    .ok_or(PayloadError::InvalidValue("number"))?;
                store.set_numeric(key, value);
            }
            SET_STRING => {
                let key = entity(data)?;
                let value = data
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or(PayloadError::InvalidValue("string"))?;
                store.set_string(key, value);
            }
            _ => {}
        }
        Ok(())
    }
}

impl ServiceExecutor for LoggingServiceExecutor {
    async fn execute(
        &self,
        service: &str,
        data: &Value,
        store: &EntityStore,
    ) -> Result<(), ServiceError> {
        tracing::info!(%service, %data, "service called");
        Self::apply(service, data, store).map_err(|err| ServiceError::new(service, err))
    }
}
