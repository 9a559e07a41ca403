//! Session error types.

use thiserror::Error;

/// Misuse of the consumer interface outside an active controller.
///
/// This is a programming error, never a session state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("session accessed outside an active controller scope")]
pub struct ScopeError;

/// Session controller error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// `start()` was called more than once
    #[error("Session controller already started")]
    AlreadyStarted,

    /// Consumer interface used outside its controller
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Navigation could not be performed by the embedding application
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] credential_store::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote returned something other than the documented status payload
    #[error("Unexpected response: {0}")]
    Protocol(String),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<session_config::CoreError> for SessionError {
    fn from(error: session_config::CoreError) -> Self {
        match error {
            session_config::CoreError::InvalidUrl(e) => SessionError::InvalidUrl(e),
            other => SessionError::Config(other.to_string()),
        }
    }
}

impl SessionError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors are connection failures, timeouts and HTTP 5xx,
    /// 408 or 429 responses.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error()
                        || status == reqwest::StatusCode::REQUEST_TIMEOUT
                        || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
                }
                // Body read aborted mid-stream
                e.is_body() || e.is_request()
            }
            _ => false,
        }
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
