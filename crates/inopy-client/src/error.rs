//! Client error types.

use inopy_oauth::AuthError;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a status that has no recovery path.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Credential recovery failed.
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),

    /// The desktop notification could not be shown.
    #[error("notification failed: {0}")]
    Notify(String),
}

impl ClientError {
    /// True when the process cannot continue (listener bind failures).
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Auth(e) if e.is_fatal())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
