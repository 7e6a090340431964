use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaylabError>;

/// Everything that can go wrong talking to Playlab.
///
/// Errors are surfaced to the caller as-is; nothing in this crate retries or
/// swallows them. Use [`PlaylabError::is_retryable`] when wrapping calls in
/// [`crate::retry::retry_with_backoff`].
#[derive(Debug, Error)]
pub enum PlaylabError {
    /// Missing or empty credentials, or no conversation to operate on.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad input detected locally, or a 400 from the service.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials rejected by the service (401/403).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Unknown conversation or project (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection, TLS or timeout failure before a status was received.
    #[error("Network error during {operation}: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Any other non-success status, or an error event inside a stream.
    #[error("API error{}: {message}", status_suffix(.status))]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("Unexpected response from {operation}: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

impl PlaylabError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaylabError::Network { .. })
    }

    /// Map a non-success HTTP status and the service's error text to a variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => PlaylabError::Validation(message),
            401 | 403 => PlaylabError::Auth(message),
            404 => PlaylabError::NotFound(message),
            _ => PlaylabError::Api {
                status: Some(status),
                message,
            },
        }
    }
}
