//! Test doubles shared by the unit tests of this crate.

use std::sync::Mutex;

use tripwire_domain::error::ServiceError;

use crate::entity_store::EntityStore;
use crate::ports::ServiceExecutor;

/// Spy executor recording every call. Services listed in `failing` return
/// an error after being recorded. `store.set_numeric` writes `data.value`
/// into `data.entity`.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
    pub failing: Vec<String>,
}

impl RecordingExecutor {
    pub fn failing(services: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: services.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn services(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(service, _)| service.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ServiceExecutor for RecordingExecutor {
    async fn execute(
        &self,
        service: &str,
        data: &serde_json::Value,
        store: &EntityStore,
    ) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((service.to_string(), data.clone()));
        if service == "store.set_numeric"
            && let (Some(entity), Some(value)) = (data["entity"].as_str(), data["value"].as_f64())
        {
            store.set_numeric(entity, value);
        }
        if self.failing.iter().any(|s| s == service) {
            return Err(ServiceError::new(service, "simulated failure"));
        }
        Ok(())
    }
}

pub fn call(service: &str) -> tripwire_domain::rule::Action {
    tripwire_domain::rule::Action::ServiceCall {
        service: service.to_string(),
        data: serde_json::Value::Null,
    }
}
