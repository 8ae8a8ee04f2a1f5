use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entity::prelude::*;

use super::DocumentStore;
use super::errors::{Result, StoreError};

// ─── Point Lookups ───────────────────────────────────────────────────────────

impl DocumentStore {
    /// Find a repository by uuid. A missing record is `Ok(None)`.
    pub async fn get_repository(&self, id: &str) -> Result<Option<RepositoryModel>> {
        Ok(Repository::find_by_id(id.to_string()).one(self.db.as_ref()).await?)
    }

    /// Find a commit by hash. A missing record is `Ok(None)`.
    pub async fn get_commit(&self, hash: &str) -> Result<Option<CommitModel>> {
        Ok(Commit::find_by_id(hash.to_string()).one(self.db.as_ref()).await?)
    }
}

// ─── Bounded Scans ───────────────────────────────────────────────────────────

impl DocumentStore {
    /// All repositories, up to the scan limit.
    pub async fn get_repositories(&self) -> Result<Vec<RepositoryModel>> {
        let records = Repository::find()
            .order_by_asc(RepositoryColumn::Id)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("repositories", None, records.len());
        Ok(records)
    }

    /// Build statuses of one repository, up to the scan limit.
    pub async fn get_statuses(&self, repository_id: &str) -> Result<Vec<BuildStatusModel>> {
        require(repository_id, "repository id")?;
        let records = BuildStatus::find()
            .filter(BuildStatusColumn::RepositoryId.eq(repository_id))
            .order_by_asc(BuildStatusColumn::Id)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("statuses", Some(repository_id), records.len());
        Ok(records)
    }

    /// Branches and tags of one repository, up to the scan limit.
    pub async fn get_refs(&self, repository_id: &str) -> Result<Vec<GitRefModel>> {
        require(repository_id, "repository id")?;
        let records = GitRef::find()
            .filter(GitRefColumn::RepositoryId.eq(repository_id))
            .order_by_asc(GitRefColumn::Id)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("refs", Some(repository_id), records.len());
        Ok(records)
    }

    /// Successful build statuses of one repository, oldest first, up to the
    /// scan limit. A truncated scan only loses the newest statuses.
    pub async fn get_successful_statuses(
        &self,
        repository_id: &str,
    ) -> Result<Vec<BuildStatusModel>> {
        require(repository_id, "repository id")?;
        let records = BuildStatus::find()
            .filter(BuildStatusColumn::RepositoryId.eq(repository_id))
            .filter(BuildStatusColumn::State.eq(BuildState::Successful))
            .order_by_asc(BuildStatusColumn::UpdatedOn)
            .order_by_asc(BuildStatusColumn::Id)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("statuses", Some(repository_id), records.len());
        Ok(records)
    }

    /// Dated tags of one repository, oldest first, up to the scan limit.
    /// Branches and undated tags are not read.
    pub async fn get_dated_tags(&self, repository_id: &str) -> Result<Vec<GitRefModel>> {
        require(repository_id, "repository id")?;
        let records = GitRef::find()
            .filter(GitRefColumn::RepositoryId.eq(repository_id))
            .filter(GitRefColumn::Kind.eq(RefKind::Tag))
            .filter(GitRefColumn::Date.is_not_null())
            .order_by_asc(GitRefColumn::Date)
            .order_by_asc(GitRefColumn::Id)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("refs", Some(repository_id), records.len());
        Ok(records)
    }

    /// Commits of one repository, newest first, up to the scan limit.
    pub async fn get_commits(&self, repository_id: &str) -> Result<Vec<CommitModel>> {
        require(repository_id, "repository id")?;
        let records = Commit::find()
            .filter(CommitColumn::RepositoryId.eq(repository_id))
            .order_by_desc(CommitColumn::Date)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("commits", Some(repository_id), records.len());
        Ok(records)
    }

    /// Deployments of one repository, oldest first, up to the scan limit.
    pub async fn get_deployments(&self, repository_id: &str) -> Result<Vec<DeploymentModel>> {
        require(repository_id, "repository id")?;
        let records = Deployment::find()
            .filter(DeploymentColumn::RepositoryId.eq(repository_id))
            .order_by_asc(DeploymentColumn::Date)
            .limit(self.scan_limit)
            .all(self.db.as_ref())
            .await?;
        self.flag_scan("deployments", Some(repository_id), records.len());
        Ok(records)
    }

    /// Warn when a scan comes close to, or hits, the result ceiling.
    ///
    /// Records past the ceiling are not returned, so hitting it means the
    /// caller saw a truncated collection.
    fn flag_scan(&self, collection: &str, repository_id: Option<&str>, returned: usize) {
        let returned = returned as u64;
        let limit = self.scan_limit;
        let repository = repository_id.unwrap_or("*");

        if returned >= limit {
            tracing::warn!(
                collection,
                repository,
                returned,
                limit,
                "Scan hit the result ceiling; records beyond it were not read"
            );
        } else if returned.saturating_mul(10) >= limit.saturating_mul(9) {
            tracing::warn!(
                collection,
                repository,
                returned,
                limit,
                "Scan is approaching the result ceiling"
            );
        }
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidArgument(format!("{what} is required")));
    }
    Ok(())
}
