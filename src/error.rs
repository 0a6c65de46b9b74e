//! Error types for harness operations.

use thiserror::Error;

use crate::trajectory::TrajectoryStatus;

/// The main error type for harness operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A step handler failed while executing an action.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A test configuration or catalog failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A finalized trajectory was asked to change status again.
    #[error("Trajectory already {from}, cannot move to {to}")]
    InvalidTransition {
        /// The status the trajectory already holds.
        from: TrajectoryStatus,
        /// The status that was requested.
        to: TrajectoryStatus,
    },

    /// The datastore answered with a non-success status code.
    #[error("Store returned {status}: {body}")]
    Store {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, as returned by the server.
        body: String,
    },

    /// The HTTP transport failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Datastore settings are missing or malformed.
    #[error("Settings error: {0}")]
    Settings(String),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

/// A specialized `Result` type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_message() {
        let err = Error::Store {
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert_eq!(err.to_string(), "Store returned 401: invalid api key");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            from: TrajectoryStatus::Completed,
            to: TrajectoryStatus::Failed,
        };
        assert_eq!(
            err.to_string(),
            "Trajectory already completed, cannot move to failed"
        );
    }

    #[test]
    fn test_from_str() {
        let err: Error = "element not found".into();
        assert!(matches!(err, Error::Message(ref m) if m == "element not found"));
    }
}
