//! Error types for the crosstalk engine

use thiserror::Error;

/// Result type alias for crosstalk operations
pub type CrosstalkResult<T> = Result<T, CrosstalkError>;

/// Errors that can occur while reconciling a conversation.
///
/// Every variant is recoverable at the controller boundary: the controller logs
/// it, records a degraded state where one applies, and keeps the session alive.
#[derive(Error, Debug)]
pub enum CrosstalkError {
    /// ASR or completion network failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No synthesis or capture capability on this host.
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// ASR payload missing expected fields.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Zero-length or zero-duration text handed to a strict estimate.
    #[error("Degenerate estimate: {0}")]
    EstimationDegenerate(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Completion timed out after {0} ms")]
    CompletionTimeout(u64),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CrosstalkError {
    /// Transport-class failures are logged and the session continues.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CrosstalkError::Transport(_)
                | CrosstalkError::Http(_)
                | CrosstalkError::CompletionTimeout(_)
        )
    }
}

impl From<config::ConfigError> for CrosstalkError {
    fn from(err: config::ConfigError) -> Self {
        CrosstalkError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(CrosstalkError::Transport("reset".to_string()).is_transport());
        assert!(CrosstalkError::CompletionTimeout(50).is_transport());
        assert!(!CrosstalkError::Completion("bad request".to_string()).is_transport());
        assert!(!CrosstalkError::MalformedEvent("no channel".to_string()).is_transport());
    }
}
