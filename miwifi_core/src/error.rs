//! Error types for the MiWiFi core library
//!
//! Errors are grouped by where they originate:
//! - Fetch errors: round-level outcomes of a concurrent fetch (timeout, cancellation)
//! - Remote errors: a single call against the router failed
//! - Validation errors: bad settings or lifecycle misuse

use thiserror::Error;

pub mod fetch;
pub mod remote;
pub mod validation;

pub use self::fetch::{FetchError, PartialFetch};
pub use self::remote::{RemoteError, RemoteErrorKind};
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the MiWiFi core library
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch round errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Errors reported by the router data source
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Validation and lifecycle errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// True when the error is a deadline/cancellation signal rather than a data failure
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Fetch(FetchError::Cancelled | FetchError::DeadlineExceeded)
        )
    }

    /// True when the fetch ran out of time before all results arrived
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Whether retrying the same call later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote(err) => err.is_transient(),
            Self::Fetch(FetchError::Timeout { .. }) => true,
            Self::Fetch(FetchError::RetriesExhausted { source, .. }) => source.is_transient(),
            _ => false,
        }
    }
}
