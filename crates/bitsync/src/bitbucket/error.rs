//! Error types for Bitbucket API operations.

use thiserror::Error;

use crate::http::HttpError;
use crate::queue::QueueError;

/// Errors raised while building or authenticating the Bitbucket client.
///
/// Page fetch failures are reported by the iterators as
/// [`PageError`](crate::pagination::PageError).
#[derive(Debug, Error)]
pub enum BitbucketError {
    /// A required argument was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration (bad base URL, transport setup).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The token endpoint rejected the credentials or returned garbage.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl BitbucketError {
    pub(crate) fn required(what: &str) -> Self {
        Self::InvalidArgument(format!("{what} is required"))
    }
}

/// Result type alias for Bitbucket client operations.
pub type Result<T> = std::result::Result<T, BitbucketError>;
