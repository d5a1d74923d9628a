//! Error types for the credential lifecycle.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors produced while obtaining or renewing credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The refresh-token grant was answered with a non-200 status.
    #[error("token refresh failed with status {status}")]
    RefreshFailed { status: u16 },

    /// The provider refused the authorization or the code exchange.
    #[error("provider denied authorization: {code}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    ProviderDenied {
        code: String,
        description: Option<String>,
    },

    /// The callback `state` did not match the token issued for this attempt.
    #[error("CSRF validation failed: expected state '{expected}', got '{}'", .got.as_deref().unwrap_or("<none>"))]
    CsrfMismatch {
        expected: String,
        got: Option<String>,
    },

    /// The interactive flow reached no outcome within the configured wait,
    /// or was abandoned through `/shutdown`.
    #[error("authorization was not completed in time")]
    ServerTimeout,

    /// No refresh token is stored; only interactive authorization can help.
    #[error("not authorized yet: run 'inopy auth login'")]
    NotAuthorized,

    /// Another interactive authorization is already running.
    #[error("an interactive authorization is already in progress")]
    AlreadyInProgress,

    /// The local callback listener could not be bound.
    #[error("failed to bind authorization listener on {addr}: {source}")]
    ListenerBind {
        addr: String,
        source: std::io::Error,
    },

    /// Reading or writing the credential store failed.
    #[error("credential store error at '{path}': {message}")]
    StoreIo { path: String, message: String },

    /// The token endpoint answered 200 with a body we could not use.
    #[error("malformed provider response: {0}")]
    MalformedProviderResponse(String),

    /// Transport-level failure talking to the provider.
    #[error("network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Errors with no fallback: the process should stop and report a
    /// configuration problem.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::ListenerBind { .. })
    }

    pub(crate) fn store(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        AuthError::StoreIo {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_bind_failure_is_fatal() {
        let bind = AuthError::ListenerBind {
            addr: "127.0.0.1:5000".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(bind.is_fatal());
        assert!(!AuthError::ServerTimeout.is_fatal());
        assert!(!AuthError::RefreshFailed { status: 400 }.is_fatal());
    }

    #[test]
    fn test_display_includes_details() {
        let err = AuthError::ProviderDenied {
            code: "access_denied".to_string(),
            description: Some("user said no".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "provider denied authorization: access_denied (user said no)"
        );

        let err = AuthError::CsrfMismatch {
            expected: "XYZ".to_string(),
            got: None,
        };
        assert!(err.to_string().contains("<none>"));
    }
}
