//! Error types for the HabitBuddy API client.

use habitbuddy_core::ServiceError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the HabitBuddy user service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response decoded but is missing required data
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Invalid request (bad base URL, client setup, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_decode() => ServiceError::malformed(e.to_string()),
            ClientError::Http(e) => ServiceError::unavailable(e.to_string()),
            ClientError::Json(e) => ServiceError::malformed(e.to_string()),
            ClientError::Api { status, message } => ServiceError::api(status, message),
            ClientError::Malformed(message) => ServiceError::malformed(message),
            ClientError::InvalidRequest(message) => ServiceError::unavailable(message),
        }
    }
}
