use std::collections::HashMap;
use std::hash::Hash;

use sea_orm::sea_query::{Alias, Expr, Func, IntoIden, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, TransactionTrait,
};

use crate::entity::prelude::*;

use super::DocumentStore;
use super::errors::Result;

/// Rows per `INSERT` statement.
const UPSERT_CHUNK: usize = 500;

// ─── Bulk Upserts ────────────────────────────────────────────────────────────

impl DocumentStore {
    /// Upsert repositories by uuid.
    ///
    /// Mirrored fields are replaced. Derived dates already stored are kept.
    pub async fn save_repositories(&self, records: Vec<RepositoryModel>) -> Result<u64> {
        let records = dedup_last(records, |r| r.id.clone());
        let count = records.len();
        let written =
            upsert_chunked::<Repository>(self.db.as_ref(), records, repository_on_conflict())
                .await?;
        tracing::debug!(count, written, "Saved repositories");
        Ok(written)
    }

    /// Upsert commits by hash.
    ///
    /// Mirrored fields are replaced. Derived dates already stored are kept.
    pub async fn save_commits(&self, records: Vec<CommitModel>) -> Result<u64> {
        let records = dedup_last(records, |c| c.hash.clone());
        let count = records.len();
        let written =
            upsert_chunked::<Commit>(self.db.as_ref(), records, commit_on_conflict())
                .await?;
        tracing::debug!(count, written, "Saved commits");
        Ok(written)
    }

    /// Upsert build statuses by `{commit_hash}-{key}`.
    pub async fn save_statuses(&self, records: Vec<BuildStatusModel>) -> Result<u64> {
        let records = dedup_last(records, |s| s.id.clone());
        let count = records.len();
        let written =
            upsert_chunked::<BuildStatus>(self.db.as_ref(), records, status_on_conflict())
                .await?;
        tracing::debug!(count, written, "Saved statuses");
        Ok(written)
    }

    /// Upsert branches and tags by `{full_name}#{name}`.
    pub async fn save_refs(&self, records: Vec<GitRefModel>) -> Result<u64> {
        let records = dedup_last(records, |r| r.id.clone());
        let count = records.len();
        let written =
            upsert_chunked::<GitRef>(self.db.as_ref(), records, ref_on_conflict())
                .await?;
        tracing::debug!(count, written, "Saved refs");
        Ok(written)
    }

    /// Upsert deployment records by their generated id.
    pub async fn save_deployments(&self, records: Vec<DeploymentModel>) -> Result<u64> {
        let records = dedup_last(records, |d| d.id);
        let count = records.len();
        let written =
            upsert_chunked::<Deployment>(self.db.as_ref(), records, deployment_on_conflict())
                .await?;
        tracing::debug!(count, written, "Saved deployments");
        Ok(written)
    }
}

/// Insert `records` in chunks inside one transaction.
async fn upsert_chunked<E>(
    db: &DatabaseConnection,
    records: Vec<E::Model>,
    on_conflict: OnConflict,
) -> Result<u64>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
{
    if records.is_empty() {
        return Ok(0);
    }

    let txn = db.begin().await?;
    let mut written = 0;
    let mut records = records.into_iter().peekable();
    while records.peek().is_some() {
        let chunk: Vec<E::ActiveModel> = records
            .by_ref()
            .take(UPSERT_CHUNK)
            .map(|m| m.into_active_model().reset_all())
            .collect();
        written += E::insert_many(chunk)
            .on_conflict(on_conflict.clone())
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(written)
}

// ─── Conflict Clauses ────────────────────────────────────────────────────────

pub(crate) fn repository_on_conflict() -> OnConflict {
    OnConflict::column(RepositoryColumn::Id)
        .update_columns([
            RepositoryColumn::Slug,
            RepositoryColumn::Name,
            RepositoryColumn::FullName,
            RepositoryColumn::Owner,
            RepositoryColumn::Project,
            RepositoryColumn::Mainbranch,
            RepositoryColumn::Description,
            RepositoryColumn::Language,
            RepositoryColumn::IsPrivate,
            RepositoryColumn::Size,
            RepositoryColumn::CreatedOn,
            RepositoryColumn::UpdatedOn,
            RepositoryColumn::SyncedAt,
        ])
        .values([
            (
                RepositoryColumn::FirstSuccessfulBuildDate,
                keep_existing(Repository, RepositoryColumn::FirstSuccessfulBuildDate),
            ),
            (
                RepositoryColumn::FirstSuccessfulDeploymentDate,
                keep_existing(Repository, RepositoryColumn::FirstSuccessfulDeploymentDate),
            ),
        ])
        .to_owned()
}

pub(crate) fn commit_on_conflict() -> OnConflict {
    OnConflict::column(CommitColumn::Hash)
        .update_columns([
            CommitColumn::RepositoryId,
            CommitColumn::RepositoryFullName,
            CommitColumn::Date,
            CommitColumn::Message,
            CommitColumn::AuthorRaw,
            CommitColumn::AuthorUuid,
            CommitColumn::AuthorDisplayName,
            CommitColumn::Parents,
        ])
        .values([
            (
                CommitColumn::FirstSuccessfulBuildDate,
                keep_existing(Commit, CommitColumn::FirstSuccessfulBuildDate),
            ),
            (
                CommitColumn::FirstSuccessfulDeploymentDate,
                keep_existing(Commit, CommitColumn::FirstSuccessfulDeploymentDate),
            ),
        ])
        .to_owned()
}

fn status_on_conflict() -> OnConflict {
    OnConflict::column(BuildStatusColumn::Id)
        .update_columns([
            BuildStatusColumn::RepositoryId,
            BuildStatusColumn::CommitHash,
            BuildStatusColumn::Key,
            BuildStatusColumn::State,
            BuildStatusColumn::Name,
            BuildStatusColumn::Url,
            BuildStatusColumn::Description,
            BuildStatusColumn::CreatedOn,
            BuildStatusColumn::UpdatedOn,
        ])
        .to_owned()
}

fn ref_on_conflict() -> OnConflict {
    OnConflict::column(GitRefColumn::Id)
        .update_columns([
            GitRefColumn::RepositoryId,
            GitRefColumn::Kind,
            GitRefColumn::Name,
            GitRefColumn::TargetHash,
            GitRefColumn::TargetDate,
            GitRefColumn::Date,
            GitRefColumn::TaggerRaw,
            GitRefColumn::Message,
        ])
        .to_owned()
}

fn deployment_on_conflict() -> OnConflict {
    OnConflict::column(DeploymentColumn::Id)
        .update_columns([
            DeploymentColumn::RepositoryId,
            DeploymentColumn::Project,
            DeploymentColumn::Date,
            DeploymentColumn::TagName,
            DeploymentColumn::CommitHash,
            DeploymentColumn::Author,
            DeploymentColumn::Repository,
        ])
        .to_owned()
}

/// `COALESCE(table.col, excluded.col)`: a stored value wins over an incoming one.
fn keep_existing<E, C>(entity: E, column: C) -> SimpleExpr
where
    E: EntityTrait,
    C: IntoIden + Copy + 'static,
{
    Func::coalesce([
        SimpleExpr::from(Expr::col((entity, column))),
        SimpleExpr::from(Expr::col((Alias::new("excluded"), column))),
    ])
    .into()
}

/// Drop earlier records that share a key with a later one, keeping order.
///
/// A single `ON CONFLICT` statement may not touch the same row twice.
fn dedup_last<T, K, F>(records: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut last: HashMap<K, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        last.insert(key(record), idx);
    }
    if last.len() == records.len() {
        return records;
    }
    records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| last.get(&key(record)) == Some(idx))
        .map(|(_, record)| record)
        .collect()
}
