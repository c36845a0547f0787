//! Error types for fusion-ctl
//!
//! Provides structured error types for the Fusion client, the reconciler,
//! the operation poller and the inventory report.

use crate::domain::ports::OperationError;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the tool
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // =========================================================================
    // Fusion API Errors
    // =========================================================================
    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Fusion API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // =========================================================================
    // Operation Errors
    // =========================================================================
    #[error("Operation {operation_id} failed: {error}")]
    OperationFailed {
        operation_id: String,
        error: OperationError,
    },

    #[error("Error while waiting for operation {operation_id}: {source}")]
    OperationWait {
        operation_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Operation {operation_id} did not finish within {waited:?}")]
    OperationTimeout {
        operation_id: String,
        waited: Duration,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable label reported in the failure record
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Internal(_) => "internal",
            Error::Configuration(_) => "configuration",
            Error::Validation(_) => "validation",
            Error::ResourceNotFound { .. } => "not_found",
            Error::Api { .. } => "api",
            Error::Transport(_) => "transport",
            Error::OperationFailed { .. } => "operation_failed",
            Error::OperationWait { .. } => "operation_wait",
            Error::OperationTimeout { .. } => "operation_timeout",
            Error::JsonParse(_) => "parse",
            Error::Io(_) => "io",
        }
    }

    /// Record printed by the CLI when a command fails
    pub fn failure_record(&self) -> Value {
        let mut record = json!({
            "failed": true,
            "msg": self.to_string(),
            "error_kind": self.kind(),
        });
        if let Error::OperationFailed {
            operation_id,
            error,
        } = self
        {
            record["operation_id"] = json!(operation_id);
            record["operation_error"] = json!(error);
        }
        record
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }

    /// The request was accepted but the asynchronous work did not succeed
    pub fn is_operation_failure(&self) -> bool {
        matches!(
            self,
            Error::OperationFailed { .. }
                | Error::OperationWait { .. }
                | Error::OperationTimeout { .. }
        )
    }
}

/// Result type alias for the tool
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = Error::ResourceNotFound {
            kind: "StorageService".into(),
            name: "ss1".into(),
        };
        assert_eq!(err.kind(), "not_found");
        assert!(err.is_not_found());
        assert!(!err.is_operation_failure());

        let err = Error::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert_eq!(err.kind(), "api");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_operation_failure_message() {
        let err = Error::OperationFailed {
            operation_id: "op-7".into(),
            error: OperationError {
                pure_code: Some("INVALID_ARGUMENT".into()),
                http_code: Some(400),
                message: Some("hardware type unsupported".into()),
                details: None,
            },
        };
        assert!(err.is_operation_failure());
        assert_eq!(
            err.to_string(),
            "Operation op-7 failed: hardware type unsupported \
             (pure_code: INVALID_ARGUMENT, http_code: 400)"
        );
    }

    #[test]
    fn test_failure_record_for_api_error() {
        let err = Error::Api {
            status: 409,
            message: "already exists".into(),
        };
        assert_eq!(
            err.failure_record(),
            json!({
                "failed": true,
                "msg": "Fusion API error (HTTP 409): already exists",
                "error_kind": "api",
            })
        );
    }

    #[test]
    fn test_failure_record_for_failed_operation() {
        let err = Error::OperationFailed {
            operation_id: "op-3".into(),
            error: OperationError {
                pure_code: Some("NOT_ENOUGH_CAPACITY".into()),
                message: Some("array full".into()),
                ..Default::default()
            },
        };
        let record = err.failure_record();

        assert_eq!(record["failed"], json!(true));
        assert_eq!(record["error_kind"], json!("operation_failed"));
        assert_eq!(record["operation_id"], json!("op-3"));
        assert_eq!(record["operation_error"]["pure_code"], json!("NOT_ENOUGH_CAPACITY"));
        assert_eq!(record["operation_error"]["message"], json!("array full"));
        assert!(record["msg"].as_str().unwrap().starts_with("Operation op-3 failed: array full"));
    }
}
