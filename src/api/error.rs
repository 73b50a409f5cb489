//! Errors raised at the remote hub boundary

/// HTTP status the hub gateway returns when a request outlives its deadline.
/// The request may still complete server-side.
pub const GATEWAY_TIMEOUT: u16 = 504;

pub const NOT_FOUND: u16 = 404;

/// Error returned by every [`HubApi`](super::HubApi) call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// The service answered with a non-success status
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// No response was received (connection refused, DNS failure, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but its body could not be understood
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::http(GATEWAY_TIMEOUT, "Gateway Timeout")
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::http(NOT_FOUND, format!("{} not found", what.into()))
    }

    /// Status of the transport response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            RemoteError::Transport(_) | RemoteError::Decode(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.status() == Some(GATEWAY_TIMEOUT)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(NOT_FOUND)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => RemoteError::http(status.as_u16(), error.to_string()),
            None if error.is_decode() => RemoteError::Decode(error.to_string()),
            None => RemoteError::Transport(error.to_string()),
        }
    }
}

/// Result of fetching a single entity, used wherever a missing entity is a
/// normal, skippable case rather than an error
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Found(T),
    NotFound,
    Failed(RemoteError),
}

impl<T> FetchOutcome<T> {
    pub fn from_result(result: Result<T, RemoteError>) -> Self {
        match result {
            Ok(value) => FetchOutcome::Found(value),
            Err(e) if e.is_not_found() => FetchOutcome::NotFound,
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            FetchOutcome::Found(value) => Some(value),
            _ => None,
        }
    }
}
