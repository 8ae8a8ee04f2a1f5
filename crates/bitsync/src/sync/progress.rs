//! Progress reporting for sync runs.
//!
//! The engine emits [`SyncProgress`] events to an optional callback; the CLI
//! turns them into log lines.

use std::sync::Arc;

/// Progress events emitted during a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Bearer token obtained.
    Authenticated {
        account: String,
    },

    /// Store collections provisioned.
    StoreReady,

    /// Listing remote repositories.
    DiscoveringRepositories {
        account: String,
    },

    /// Remote listing compared with the store.
    OutdatedRepositories {
        /// Repositories listed remotely.
        total: usize,
        /// Repositories scheduled for sync.
        outdated: usize,
    },

    /// A repository job was admitted by the job queue.
    RepositoryStarted {
        slug: String,
        /// Previously stored `updated_on`, if any.
        watermark: Option<String>,
    },

    /// New commits, their statuses, and refs were saved.
    RepositoryFetched {
        slug: String,
        commits: usize,
        statuses: usize,
        refs: usize,
    },

    /// Build dates were propagated.
    BuildDatesPropagated {
        slug: String,
        /// Commits newly stamped.
        stamped: u64,
    },

    /// Deployment dates were propagated.
    DeploymentDatesPropagated {
        slug: String,
        /// Commits newly stamped.
        stamped: u64,
        /// Qualifying deployment tags.
        deployments: usize,
    },

    RepositoryFinished {
        slug: String,
    },

    RepositoryFailed {
        slug: String,
        error: String,
    },

    /// All jobs settled.
    Complete {
        synchronized: usize,
        failed: usize,
    },
}

/// Callback for progress updates. Shared with every spawned repository job.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
