//! Bitbucket Cloud 2.0 API client.
//!
//! Each resource class (repositories, commits, statuses, refs) is fetched
//! through its own named queue, so unrelated call sites share the same
//! request budget per class.

pub mod client;
pub mod error;
pub mod oauth;
pub mod types;

pub use client::{BitbucketClient, BitbucketConfig, ResourceQueues};
pub use error::BitbucketError;
pub use types::{
    RemoteAccount, RemoteAuthor, RemoteBranch, RemoteCommit, RemoteCommitLink, RemoteProject, RemoteRef,
    RemoteRefTarget, RemoteRepository, RemoteRepositoryLink, RemoteStatus,
};
