use thiserror::Error;

use crate::bitbucket::BitbucketError;
use crate::pagination::PageError;
use crate::queue::QueueError;
use crate::store::StoreError;

/// Errors that can occur during a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Bitbucket(#[from] BitbucketError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A spawned job panicked or was cancelled.
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Some repository jobs failed. The others ran to completion.
    #[error(
        "{failed} of {total} repositories failed to sync: {joined}",
        total = .succeeded + .failed,
        joined = .errors.join("; ")
    )]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        errors: Vec<String>,
    },
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_lists_every_error() {
        let err = SyncError::PartialFailure {
            succeeded: 3,
            failed: 2,
            errors: vec!["widgets: boom".into(), "gadgets: bang".into()],
        };
        assert_eq!(
            err.to_string(),
            "2 of 5 repositories failed to sync: widgets: boom; gadgets: bang"
        );
    }
}
