//! Document store over five collections: repositories, commits, statuses,
//! refs and deployments.
//!
//! Every collection is keyed by a stable identifier and written with upserts,
//! so re-running a sync never duplicates a record. The two derived date
//! fields are only ever filled in once: both the upserts and the partial
//! updates keep an existing value over a new one.

mod ancestors;
mod errors;
mod query;
mod schema;
mod update;
mod upsert;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm::prelude::DateTimeWithTimeZone;

pub use errors::{Result, StoreError};

/// Default ceiling on the number of records a bulk read returns.
pub const MAX_SCAN_RESULTS: u64 = 10_000;

/// Partial update of the derived date fields.
///
/// Absent fields are left alone. Present fields only fill in values that
/// are still unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatePatch {
    pub first_successful_build_date: Option<DateTimeWithTimeZone>,
    pub first_successful_deployment_date: Option<DateTimeWithTimeZone>,
}

impl DatePatch {
    pub fn build(date: DateTimeWithTimeZone) -> Self {
        Self {
            first_successful_build_date: Some(date),
            ..Self::default()
        }
    }

    pub fn deployment(date: DateTimeWithTimeZone) -> Self {
        Self {
            first_successful_deployment_date: Some(date),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_successful_build_date.is_none()
            && self.first_successful_deployment_date.is_none()
    }
}

/// Handle to the document store. Cheap to clone.
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<DatabaseConnection>,
    scan_limit: u64,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("scan_limit", &self.scan_limit)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db: Arc::new(db),
            scan_limit: MAX_SCAN_RESULTS,
        }
    }

    /// Override the bulk read ceiling. Zero is treated as one.
    pub fn with_scan_limit(mut self, limit: u64) -> Self {
        self.scan_limit = limit.max(1);
        self
    }

    /// Connect to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(crate::db::connect(url).await?))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    pub fn scan_limit(&self) -> u64 {
        self.scan_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn date_patch_constructors_fill_one_field() {
        let now = Utc::now().fixed_offset();
        assert!(DatePatch::default().is_empty());

        let build = DatePatch::build(now);
        assert_eq!(build.first_successful_build_date, Some(now));
        assert!(build.first_successful_deployment_date.is_none());
        assert!(!build.is_empty());

        let deployment = DatePatch::deployment(now);
        assert!(deployment.first_successful_build_date.is_none());
        assert_eq!(deployment.first_successful_deployment_date, Some(now));
    }

    #[test]
    fn scan_limit_defaults_and_clamps() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let store = DocumentStore::new(db);
        assert_eq!(store.scan_limit(), MAX_SCAN_RESULTS);
        assert_eq!(store.with_scan_limit(0).scan_limit(), 1);
    }

    #[test]
    fn clones_share_one_connection() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let store = DocumentStore::new(db);
        let clone = store.clone().with_scan_limit(5);

        assert!(std::ptr::eq(store.connection(), clone.connection()));
        assert_eq!(store.scan_limit(), MAX_SCAN_RESULTS);
        assert_eq!(format!("{clone:?}"), "DocumentStore { scan_limit: 5, .. }");
    }
}
