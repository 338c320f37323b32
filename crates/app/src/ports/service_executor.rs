//! Service executor port: where `service_call` actions end up.

use std::future::Future;
use std::sync::Arc;

use tripwire_domain::error::ServiceError;

use crate::entity_store::EntityStore;

/// Executes named services on behalf of rules (play a sound, flash the UI,
/// write state, …).
///
/// The dispatcher passes `service` and `data` through untouched. The store
/// is handed over so services can read or mutate shared state.
pub trait ServiceExecutor: Send + Sync {
    /// Execute one service call.
    fn execute(
        &self,
        service: &str,
        data: &serde_json::Value,
        store: &EntityStore,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

impl<T: ServiceExecutor> ServiceExecutor for Arc<T> {
    fn execute(
        &self,
        service: &str,
        data: &serde_json::Value,
        store: &EntityStore,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send {
        (**self).execute(service, data, store)
    }
}
