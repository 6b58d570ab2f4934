//! Error taxonomy for the bridge.
//!
//! Transport and frame errors are handled in place (the peer is dropped or the
//! frame is discarded); the variants here are the errors that cross module or
//! process boundaries: HTTP request failures, lifecycle failures surfaced to
//! the host, and host-contract breakage.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request addressed a task id other than the live session.
    #[error("unknown task id: {task_id}")]
    TaskNotFound { task_id: String },

    /// The request body was not parseable as JSON.
    #[error("invalid JSON payload")]
    InvalidJson,

    /// The listener could not be bound; surfaced from lifecycle start so the
    /// host can decide whether to exit.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The host's input-injection channel has been closed.
    #[error("host input channel is closed")]
    InputClosed,

    #[error("{message}")]
    Internal { message: String },
}

impl BridgeError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code for errors that surface through the HTTP layer.
    pub fn status(&self) -> u16 {
        match self {
            BridgeError::TaskNotFound { .. } => 404,
            BridgeError::InvalidJson => 400,
            BridgeError::Bind { .. } | BridgeError::InputClosed | BridgeError::Internal { .. } => {
                500
            }
        }
    }

    /// The client-facing message. Fixed strings on purpose: the wire contract
    /// pins the 400/404 bodies, and internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            BridgeError::TaskNotFound { .. } => "Not Found",
            BridgeError::InvalidJson => "Invalid JSON payload",
            BridgeError::Bind { .. } | BridgeError::InputClosed | BridgeError::Internal { .. } => {
                "Internal Server Error"
            }
        }
    }
}

/// JSON body for HTTP error responses: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&BridgeError> for ErrorBody {
    fn from(err: &BridgeError) -> Self {
        Self {
            error: err.public_message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_wire_contract() {
        let not_found = BridgeError::TaskNotFound {
            task_id: "t1".to_string(),
        };
        assert_eq!(not_found.status(), 404);
        assert_eq!(not_found.public_message(), "Not Found");

        assert_eq!(BridgeError::InvalidJson.status(), 400);
        assert_eq!(
            BridgeError::InvalidJson.public_message(),
            "Invalid JSON payload"
        );
    }

    #[test]
    fn error_body_serializes_to_the_fixed_shape() {
        let body = ErrorBody::from(&BridgeError::InvalidJson);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Invalid JSON payload" }));
    }
}
