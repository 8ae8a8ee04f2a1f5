//! Sync orchestration and derived-date propagation.
//!
//! # Module Structure
//!
//! - [`engine`] - `Synchronizer`: discovery, per-repository jobs
//! - [`propagate`] - first build and first deployment date passes
//! - [`convert`] - remote payload to stored record mapping
//! - `types` - `SyncOptions`, `SyncReport`, constants
//! - `progress` - `SyncProgress`, `ProgressCallback`, `emit()`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bitsync::sync::{SyncOptions, SyncProgress, Synchronizer};
//!
//! let sync = Synchronizer::new(client, store, registry, SyncOptions::default())?
//!     .with_progress(Arc::new(|event: SyncProgress| println!("{event:?}")));
//! let report = sync.execute().await?;
//! ```

pub mod convert;
pub mod engine;
mod error;
mod progress;
pub mod propagate;
mod types;

pub use engine::{Synchronizer, is_outdated};
pub use error::{Result, SyncError};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use propagate::{PropagationOutcome, propagate_build_dates, propagate_deployment_dates};
pub use types::{
    DEFAULT_DEPLOYMENT_TAGS_PATTERN, DEFAULT_REPOSITORY_CONCURRENCY, RepositorySyncStats,
    SyncOptions, SyncReport,
};
