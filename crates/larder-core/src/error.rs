//! Error types for the Larder system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failed validation check, tied to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum LarderError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation failed: {}", render_violations(violations))]
    Validation { violations: Vec<FieldViolation> },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: f64, available: f64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LarderResult<T> = Result<T, LarderError>;

impl LarderError {
    /// Short machine-readable label for the failure class.
    pub fn status(&self) -> &'static str {
        match self {
            LarderError::NotFound { .. } => "NOT_FOUND",
            LarderError::AlreadyExists { .. } | LarderError::Conflict(_) => "CONFLICT",
            LarderError::AuthenticationFailed { .. } => "UNAUTHENTICATED",
            LarderError::AuthorizationDenied { .. } => "FORBIDDEN",
            LarderError::Validation { .. } => "VALIDATION_FAILED",
            LarderError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            LarderError::Database(_) | LarderError::Crypto(_) | LarderError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Whether the failure is an internal fault whose details must not
    /// reach callers.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            LarderError::Database(_) | LarderError::Crypto(_) | LarderError::Internal(_)
        )
    }

    /// Convert into the uniform wire-level error envelope.
    ///
    /// Internal faults are masked with a generic message; all other
    /// classes carry their full description.
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };
        ErrorResponse {
            status: self.status().to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Uniform error envelope returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_distinct_status() {
        let errors = [
            LarderError::NotFound {
                entity: "group".into(),
                id: "x".into(),
            },
            LarderError::AlreadyExists {
                entity: "user".into(),
            },
            LarderError::AuthenticationFailed {
                reason: "bad credentials".into(),
            },
            LarderError::AuthorizationDenied {
                reason: "missing grant".into(),
            },
            LarderError::Validation {
                violations: vec![FieldViolation::new("name", "must not be empty")],
            },
            LarderError::InsufficientStock {
                requested: 2.0,
                available: 1.0,
            },
            LarderError::Internal("boom".into()),
        ];
        let mut statuses: Vec<_> = errors.iter().map(|e| e.status()).collect();
        statuses.sort();
        statuses.dedup();
        assert_eq!(statuses.len(), errors.len());
    }

    #[test]
    fn internal_details_are_masked_in_responses() {
        let err = LarderError::Database("connection refused to db:8000".into());
        let resp = err.to_response();
        assert_eq!(resp.status, "INTERNAL_ERROR");
        assert!(!resp.message.contains("8000"));
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = LarderError::Validation {
            violations: vec![
                FieldViolation::new("name", "must not be empty"),
                FieldViolation::new("quantity", "must be greater than zero"),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("name"));
        assert!(rendered.contains("quantity"));
    }
}
