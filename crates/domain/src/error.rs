//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors.
//! The dispatcher itself never fails a rule on bad input: unknown tags and
//! missing entities degrade to "does not match". These errors only cover the
//! edges (parsing rule definitions, external service calls).

/// Boxed error raised by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type of the workspace.
#[derive(Debug, thiserror::Error)]
pub enum TripwireError {
    /// The rule document is not valid JSON.
    #[error("rule definitions are not valid JSON")]
    Definition(#[source] serde_json::Error),
}

/// Failure reported by a service executor for a single call.
#[derive(Debug, thiserror::Error)]
#[error("service `{service}` failed")]
pub struct ServiceError {
    pub service: String,
    #[source]
    pub source: BoxError,
}

impl ServiceError {
    /// Wrap any error raised while executing `service`.
    pub fn new(service: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            service: service.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn should_display_service_name() {
        let err = ServiceError::new("audio.play", "device busy");
        assert_eq!(err.to_string(), "service `audio.play` failed");
        assert_eq!(err.source().unwrap().to_string(), "device busy");
    }

    #[test]
    fn should_keep_parse_error_as_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad").unwrap_err();
        let err = TripwireError::Definition(json_err);
        assert!(err.source().is_some());
    }
}
