use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, IntoIden, SimpleExpr};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};

use crate::entity::prelude::*;

use super::errors::Result;
use super::{DatePatch, DocumentStore};

/// Ids per `UPDATE ... WHERE id IN (...)`.
const UPDATE_CHUNK: usize = 500;

// ─── Partial Updates ─────────────────────────────────────────────────────────

impl DocumentStore {
    /// Fill in derived dates on the given commits.
    ///
    /// Dates already set are kept. Hashes with no stored commit are ignored.
    /// Returns the number of rows matched.
    pub async fn update_commits(&self, hashes: &[String], patch: &DatePatch) -> Result<u64> {
        if hashes.is_empty() || patch.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let mut matched = 0;
        for chunk in hashes.chunks(UPDATE_CHUNK) {
            let mut update = Commit::update_many();
            if let Some(date) = patch.first_successful_build_date {
                update = update.col_expr(
                    CommitColumn::FirstSuccessfulBuildDate,
                    fill_once(CommitColumn::FirstSuccessfulBuildDate, date),
                );
            }
            if let Some(date) = patch.first_successful_deployment_date {
                update = update.col_expr(
                    CommitColumn::FirstSuccessfulDeploymentDate,
                    fill_once(CommitColumn::FirstSuccessfulDeploymentDate, date),
                );
            }
            matched += update
                .filter(CommitColumn::Hash.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?
                .rows_affected;
        }
        txn.commit().await?;

        tracing::debug!(requested = hashes.len(), matched, "Updated commits");
        Ok(matched)
    }

    /// Fill in derived dates on the given repositories.
    ///
    /// Dates already set are kept. Returns the number of rows matched.
    pub async fn update_repositories(&self, ids: &[String], patch: &DatePatch) -> Result<u64> {
        if ids.is_empty() || patch.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let mut matched = 0;
        for chunk in ids.chunks(UPDATE_CHUNK) {
            let mut update = Repository::update_many();
            if let Some(date) = patch.first_successful_build_date {
                update = update.col_expr(
                    RepositoryColumn::FirstSuccessfulBuildDate,
                    fill_once(RepositoryColumn::FirstSuccessfulBuildDate, date),
                );
            }
            if let Some(date) = patch.first_successful_deployment_date {
                update = update.col_expr(
                    RepositoryColumn::FirstSuccessfulDeploymentDate,
                    fill_once(RepositoryColumn::FirstSuccessfulDeploymentDate, date),
                );
            }
            matched += update
                .filter(RepositoryColumn::Id.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?
                .rows_affected;
        }
        txn.commit().await?;

        tracing::debug!(requested = ids.len(), matched, "Updated repositories");
        Ok(matched)
    }
}

/// `COALESCE(col, date)`.
fn fill_once<C>(column: C, date: DateTimeWithTimeZone) -> SimpleExpr
where
    C: IntoIden + Copy + 'static,
{
    Func::coalesce([SimpleExpr::from(Expr::col(column)), Expr::value(date)]).into()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};

    use super::*;

    #[tokio::test]
    async fn empty_id_list_is_a_no_op() {
        // No exec results queued: any statement would fail.
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let store = DocumentStore::new(db);
        let patch = DatePatch::build(Utc::now().fixed_offset());

        assert_eq!(store.update_commits(&[], &patch).await.unwrap(), 0);
        assert_eq!(store.update_repositories(&[], &patch).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_patch_is_a_no_op() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let store = DocumentStore::new(db);

        let updated = store
            .update_commits(&["abc".to_string()], &DatePatch::default())
            .await
            .unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn update_commits_returns_rows_matched() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 2,
                last_insert_id: 0,
            }])
            .into_connection();
        let store = DocumentStore::new(db);

        let updated = store
            .update_commits(
                &["a".to_string(), "b".to_string()],
                &DatePatch::deployment(Utc::now().fixed_offset()),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);
    }

    #[test]
    fn fill_once_keeps_an_existing_value() {
        let date = Utc::now().fixed_offset();
        let sql = Commit::update_many()
            .col_expr(
                CommitColumn::FirstSuccessfulBuildDate,
                fill_once(CommitColumn::FirstSuccessfulBuildDate, date),
            )
            .filter(CommitColumn::Hash.is_in(["a"]))
            .build(DatabaseBackend::Sqlite)
            .to_string();

        assert!(
            sql.contains(r#"SET "first_successful_build_date" = COALESCE("first_successful_build_date", "#),
            "{sql}"
        );
        assert!(sql.contains(r#""hash" IN ('a')"#), "{sql}");
    }
}
