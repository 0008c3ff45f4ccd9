//! Core error types for the HabitBuddy client.
//!
//! This module defines transport-agnostic error types. HTTP-specific errors
//! (from reqwest, serde, etc.) are converted to [`ServiceError`] by the client
//! crate before they reach the aggregation and enrollment engines.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for goal-match aggregation and enrollment.
#[derive(Error, Debug)]
pub enum Error {
    /// The initial match fetch failed.
    #[error("Failed to fetch goal matches for user {user_id}: {source}")]
    Upstream {
        user_id: String,
        #[source]
        source: ServiceError,
    },

    /// An enrichment lookup failed while joining a run (strict join policy).
    #[error("Failed to enrich record {record_id}: {source}")]
    Join {
        record_id: String,
        #[source]
        source: ServiceError,
    },

    /// The match service returned a record that breaks its own contract.
    #[error("Inconsistent goal-match record {record_id}: {reason}")]
    InconsistentRecord { record_id: String, reason: String },

    #[error("Failed to load goal catalog: {0}")]
    CatalogLoad(#[source] ServiceError),

    #[error("Input validation failed: {0}")]
    Validation(String),

    #[error("A goal submission is already in flight")]
    ConcurrentSubmission,

    #[error("Failed to enroll in goal {goal_id}: {source}")]
    Enrollment {
        goal_id: String,
        #[source]
        source: ServiceError,
    },

    #[error("Cannot {action} while enrollment is {state}")]
    InvalidTransition { action: String, state: String },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    pub fn inconsistent(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InconsistentRecord {
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(action: impl Into<String>, state: impl ToString) -> Self {
        Self::InvalidTransition {
            action: action.into(),
            state: state.to_string(),
        }
    }
}

/// Transport-agnostic error returned by the remote service traits.
///
/// Implementations convert their own failures (HTTP, decoding, ...) into one
/// of these variants so the core never depends on a particular client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service could not be reached or did not answer in time.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered with a payload that does not match its contract.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
