//! Fetch round error types

use crate::snapshot::RouterDataSnapshot;
use std::time::Duration;
use thiserror::Error;

/// Round-level fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Not every task reported back before the fetch timeout
    #[error("Fetch timed out after {timeout:?}: received {received} of {total} results")]
    Timeout {
        received: usize,
        total: usize,
        timeout: Duration,
    },

    /// The caller cancelled the fetch
    #[error("Fetch cancelled")]
    Cancelled,

    /// The context deadline elapsed
    #[error("Fetch deadline exceeded")]
    DeadlineExceeded,

    /// A single operation kept failing until the retry budget ran out
    #[error("Operation '{operation}' failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<super::Error>,
    },
}

impl FetchError {
    /// Create a timeout error
    pub fn timeout(received: usize, total: usize, timeout: Duration) -> Self {
        Self::Timeout {
            received,
            total,
            timeout,
        }
    }

    /// Create a retries exhausted error
    pub fn retries_exhausted(operation: &str, attempts: u32, source: super::Error) -> Self {
        Self::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
            source: Box::new(source),
        }
    }

    /// Check if this is the timeout kind
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Number of results received before the timeout fired
    pub fn received(&self) -> Option<usize> {
        match self {
            Self::Timeout { received, .. } => Some(*received),
            _ => None,
        }
    }

    /// Number of results that were expected
    pub fn total(&self) -> Option<usize> {
        match self {
            Self::Timeout { total, .. } => Some(*total),
            _ => None,
        }
    }
}

/// A fetch that did not fully succeed
///
/// The snapshot holds every field that was fetched successfully. Callers should
/// use whatever fields are present and treat `error` as the reason the rest is
/// missing.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct PartialFetch {
    /// Fields that did arrive
    pub snapshot: RouterDataSnapshot,
    /// Timeout, cancellation, or the first per-item error by completion order
    #[source]
    pub error: super::Error,
}

impl PartialFetch {
    pub fn new(snapshot: RouterDataSnapshot, error: super::Error) -> Self {
        Self { snapshot, error }
    }

    /// True when the round ran out of time, as opposed to an item failing
    pub fn is_timeout(&self) -> bool {
        self.error.is_timeout()
    }

    /// Split into the partial snapshot and the error
    pub fn into_parts(self) -> (RouterDataSnapshot, super::Error) {
        (self.snapshot, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RemoteError};

    #[test]
    fn test_timeout_accessors() {
        let error = FetchError::timeout(2, 4, Duration::from_millis(10));
        assert!(error.is_timeout());
        assert_eq!(error.received(), Some(2));
        assert_eq!(error.total(), Some(4));
        assert!(error.to_string().contains("received 2 of 4"));
    }

    #[test]
    fn test_non_timeout_accessors() {
        let error = FetchError::Cancelled;
        assert!(!error.is_timeout());
        assert_eq!(error.received(), None);
        assert_eq!(error.total(), None);
    }

    #[test]
    fn test_partial_fetch_keeps_snapshot() {
        let partial = PartialFetch::new(
            RouterDataSnapshot::default(),
            Error::Remote(RemoteError::network("get_wan_info", "unreachable")),
        );

        assert!(!partial.is_timeout());
        assert!(partial.to_string().contains("unreachable"));

        let (snapshot, error) = partial.into_parts();
        assert_eq!(snapshot.populated_count(), 0);
        assert!(matches!(error, Error::Remote(_)));
    }
}
