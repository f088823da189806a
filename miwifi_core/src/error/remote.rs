//! Errors reported by the router data source

use thiserror::Error;

/// A failed call against the router
#[derive(Error, Debug, Clone)]
#[error("{operation} failed ({kind}): {message}")]
pub struct RemoteError {
    /// Kind of failure
    pub kind: RemoteErrorKind,
    /// Operation that failed, e.g. `get_wan_info`
    pub operation: String,
    /// Detail from the data source
    pub message: String,
}

/// Kind of remote failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Transport level failure
    Network,
    /// Login or token rejected
    Authentication,
    /// The router answered with a non-zero API code
    Api { code: i64 },
    /// The payload could not be decoded
    Decode,
    /// The call itself timed out
    Timeout,
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Authentication => write!(f, "authentication"),
            Self::Api { code } => write!(f, "api code {code}"),
            Self::Decode => write!(f, "decode"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

impl RemoteError {
    fn new(kind: RemoteErrorKind, operation: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(operation: &str, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, operation, message)
    }

    /// Create an authentication error
    pub fn authentication(operation: &str, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Authentication, operation, message)
    }

    /// Create an API error carrying the router's response code
    pub fn api(operation: &str, code: i64, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Api { code }, operation, message)
    }

    /// Create a decode error
    pub fn decode(operation: &str, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Decode, operation, message)
    }

    /// Create a call timeout error
    pub fn timeout(operation: &str, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, operation, message)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::Network | RemoteErrorKind::Timeout
        )
    }
}
