//! Bitsync - an incremental Bitbucket mirror.
//!
//! This library pulls repositories, commits, build statuses and refs for one
//! Bitbucket account into a document store, then derives for every commit the
//! date of the first successful build and the first deployment that contains
//! it.
//!
//! # Features
//!
//! - `sqlite` - SQLite store backend (default).
//! - `postgres` - PostgreSQL store backend (default).
//!
//! # Example
//!
//! ```ignore
//! use bitsync::{BitbucketClient, BitbucketConfig, DocumentStore, QueueRegistry, Synchronizer, SyncOptions};
//!
//! let registry = QueueRegistry::global();
//! let client = BitbucketClient::new(BitbucketConfig::new("acme"), registry)?;
//! let store = DocumentStore::connect("sqlite://bitsync.db?mode=rwc").await?;
//!
//! let report = Synchronizer::new(client, store, registry, SyncOptions::default())?
//!     .execute()
//!     .await?;
//! println!("{} repositories synchronized", report.synchronized.len());
//! ```

pub mod bitbucket;
pub mod db;
pub mod entity;
pub mod http;
pub mod pagination;
pub mod queue;
pub mod store;
pub mod sync;

pub use bitbucket::{BitbucketClient, BitbucketConfig, BitbucketError, ResourceQueues};
pub use db::connect;
pub use entity::prelude::*;
pub use pagination::{Page, PageError, PageIterator, PageState, Paginated};
pub use queue::{Queue, QueueError, QueueOptions, QueueRegistry};
pub use store::{DatePatch, DocumentStore, MAX_SCAN_RESULTS, StoreError};
pub use sync::{
    ProgressCallback, SyncError, SyncOptions, SyncProgress, SyncReport, Synchronizer,
};
