//! Core error taxonomy.
//!
//! Every fallible operation in the core maps into one of these kinds so the
//! HTTP layer can translate them uniformly. Validation and state errors are
//! never retried; third-party failures are retried only by the generation
//! loops that own a retry budget.

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Missing or invalid credentials.
    #[error("authentication failed: {0}")]
    AuthFail(String),

    /// Input or model output failed validation. `details` carries
    /// structured context (offending indices, computed values).
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// An illegal batch state transition was attempted.
    #[error("invalid transition from {current} to {target}")]
    StateTransition {
        current: String,
        target: String,
        allowed: Vec<String>,
    },

    /// An upstream provider (LLM, video, CDN) failed.
    #[error("{message}")]
    ThirdParty { message: String, details: Value },

    /// An upstream provider rejected the call for quota reasons.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A duplicate of an already-applied request was detected.
    #[error("idempotency conflict: {0}")]
    IdempotencyConflict(String),

    /// Storage or other internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Validation error without structured details.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Value::Null,
        }
    }

    /// Validation error with structured details.
    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// Third-party failure without structured details.
    pub fn third_party(message: impl Into<String>) -> Self {
        Self::ThirdParty {
            message: message.into(),
            details: Value::Null,
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::AuthFail(_) => "auth_fail",
            CoreError::Validation { .. } => "validation_error",
            CoreError::StateTransition { .. } => "state_transition_error",
            CoreError::ThirdParty { .. } => "third_party_fail",
            CoreError::RateLimit(_) => "rate_limit",
            CoreError::NotFound(_) => "not_found",
            CoreError::IdempotencyConflict(_) => "idempotency_conflict",
            CoreError::Internal(_) => "internal_error",
        }
    }

    /// Structured details payload for the response envelope.
    pub fn details(&self) -> Value {
        match self {
            CoreError::Validation { details, .. } | CoreError::ThirdParty { details, .. } => {
                details.clone()
            }
            CoreError::StateTransition {
                current,
                target,
                allowed,
            } => json!({
                "current_state": current,
                "target_state": target,
                "allowed": allowed,
            }),
            _ => Value::Null,
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound("row not found".into()),
            other => CoreError::Internal(format!("database error: {}", other)),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization error: {}", e))
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        CoreError::ThirdParty {
            message: format!("http error: {}", e),
            details: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::AuthFail("x".into()).code(), "auth_fail");
        assert_eq!(CoreError::validation("bad").code(), "validation_error");
        assert_eq!(CoreError::third_party("down").code(), "third_party_fail");
        assert_eq!(CoreError::RateLimit("slow".into()).code(), "rate_limit");
        assert_eq!(CoreError::NotFound("p1".into()).code(), "not_found");
        assert_eq!(
            CoreError::IdempotencyConflict("dup".into()).code(),
            "idempotency_conflict"
        );
        assert_eq!(CoreError::Internal("boom".into()).code(), "internal_error");
    }

    #[test]
    fn test_state_transition_details() {
        let err = CoreError::StateTransition {
            current: "S1_SETUP".into(),
            target: "S6_QA".into(),
            allowed: vec!["S2_SEEDED".into()],
        };
        assert_eq!(err.code(), "state_transition_error");
        let details = err.details();
        assert_eq!(details["current_state"], "S1_SETUP");
        assert_eq!(details["allowed"][0], "S2_SEEDED");
    }

    #[test]
    fn test_validation_details_carried() {
        let err = CoreError::validation_with("duplicate cta", json!({"indices": [0, 2]}));
        assert_eq!(err.details()["indices"][1], 2);
        assert_eq!(err.to_string(), "duplicate cta");
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: CoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), "not_found");
    }
}
