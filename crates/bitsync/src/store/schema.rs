//! Collection provisioning.
//!
//! Each table is created on its own with `IF NOT EXISTS`, so a store where
//! some collections already exist is completed without touching them.

use sea_orm_migration::prelude::*;

use super::DocumentStore;
use super::errors::Result;

impl DocumentStore {
    /// Ensure all five collections and their lookup indexes exist.
    pub async fn setup(&self) -> Result<()> {
        let manager = SchemaManager::new(self.db.as_ref());
        create_repositories(&manager).await?;
        create_commits(&manager).await?;
        create_statuses(&manager).await?;
        create_refs(&manager).await?;
        create_deployments(&manager).await?;
        tracing::debug!("Document store collections ready");
        Ok(())
    }

    /// Drop all five collections.
    pub async fn reset(&self) -> Result<()> {
        let manager = SchemaManager::new(self.db.as_ref());
        manager
            .drop_table(Table::drop().table(Deployments::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Refs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Statuses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commits::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).if_exists().to_owned())
            .await?;
        tracing::info!("Dropped all collections");
        Ok(())
    }

    /// Whether a collection exists.
    pub async fn has_collection(&self, name: &str) -> Result<bool> {
        let manager = SchemaManager::new(self.db.as_ref());
        Ok(manager.has_table(name).await?)
    }
}

async fn create_repositories(manager: &SchemaManager<'_>) -> std::result::Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Repositories::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Repositories::Id)
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Repositories::Slug).string().not_null())
                .col(ColumnDef::new(Repositories::Name).string().null())
                .col(ColumnDef::new(Repositories::FullName).string().null())
                .col(ColumnDef::new(Repositories::Owner).string().null())
                .col(ColumnDef::new(Repositories::Project).string().null())
                .col(ColumnDef::new(Repositories::Mainbranch).string().null())
                .col(ColumnDef::new(Repositories::Description).text().null())
                .col(ColumnDef::new(Repositories::Language).string().null())
                .col(ColumnDef::new(Repositories::IsPrivate).boolean().null())
                .col(ColumnDef::new(Repositories::Size).big_integer().null())
                .col(
                    ColumnDef::new(Repositories::CreatedOn)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Repositories::UpdatedOn)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(Repositories::FirstSuccessfulBuildDate)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Repositories::FirstSuccessfulDeploymentDate)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Repositories::SyncedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await
}

async fn create_commits(manager: &SchemaManager<'_>) -> std::result::Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Commits::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Commits::Hash)
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Commits::RepositoryId).string().not_null())
                .col(ColumnDef::new(Commits::RepositoryFullName).string().null())
                .col(
                    ColumnDef::new(Commits::Date)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(ColumnDef::new(Commits::Message).text().null())
                .col(ColumnDef::new(Commits::AuthorRaw).string().null())
                .col(ColumnDef::new(Commits::AuthorUuid).string().null())
                .col(ColumnDef::new(Commits::AuthorDisplayName).string().null())
                .col(
                    ColumnDef::new(Commits::Parents)
                        .json()
                        .not_null()
                        .default(Expr::cust("'[]'")),
                )
                .col(
                    ColumnDef::new(Commits::FirstSuccessfulBuildDate)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Commits::FirstSuccessfulDeploymentDate)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name("idx_commits_repository_id")
                .table(Commits::Table)
                .col(Commits::RepositoryId)
                .to_owned(),
        )
        .await
}

async fn create_statuses(manager: &SchemaManager<'_>) -> std::result::Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Statuses::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Statuses::Id)
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Statuses::RepositoryId).string().not_null())
                .col(ColumnDef::new(Statuses::CommitHash).string().not_null())
                .col(ColumnDef::new(Statuses::Key).string().not_null())
                .col(ColumnDef::new(Statuses::State).string().not_null())
                .col(ColumnDef::new(Statuses::Name).string().null())
                .col(ColumnDef::new(Statuses::Url).text().null())
                .col(ColumnDef::new(Statuses::Description).text().null())
                .col(
                    ColumnDef::new(Statuses::CreatedOn)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(Statuses::UpdatedOn)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name("idx_statuses_repository_id")
                .table(Statuses::Table)
                .col(Statuses::RepositoryId)
                .to_owned(),
        )
        .await
}

async fn create_refs(manager: &SchemaManager<'_>) -> std::result::Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Refs::Table)
                .if_not_exists()
                .col(ColumnDef::new(Refs::Id).string().not_null().primary_key())
                .col(ColumnDef::new(Refs::RepositoryId).string().not_null())
                .col(ColumnDef::new(Refs::Kind).string().not_null())
                .col(ColumnDef::new(Refs::Name).string().not_null())
                .col(ColumnDef::new(Refs::TargetHash).string().null())
                .col(
                    ColumnDef::new(Refs::TargetDate)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(ColumnDef::new(Refs::Date).timestamp_with_time_zone().null())
                .col(ColumnDef::new(Refs::TaggerRaw).string().null())
                .col(ColumnDef::new(Refs::Message).text().null())
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name("idx_refs_repository_id")
                .table(Refs::Table)
                .col(Refs::RepositoryId)
                .to_owned(),
        )
        .await
}

async fn create_deployments(manager: &SchemaManager<'_>) -> std::result::Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Deployments::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Deployments::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Deployments::RepositoryId).string().not_null())
                .col(ColumnDef::new(Deployments::Project).string().null())
                .col(
                    ColumnDef::new(Deployments::Date)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(ColumnDef::new(Deployments::TagName).string().not_null())
                .col(ColumnDef::new(Deployments::CommitHash).string().not_null())
                .col(ColumnDef::new(Deployments::Author).string().null())
                .col(ColumnDef::new(Deployments::Repository).json().not_null())
                .to_owned(),
        )
        .await
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Slug,
    Name,
    FullName,
    Owner,
    Project,
    Mainbranch,
    Description,
    Language,
    IsPrivate,
    Size,
    CreatedOn,
    UpdatedOn,
    FirstSuccessfulBuildDate,
    FirstSuccessfulDeploymentDate,
    SyncedAt,
}

#[derive(DeriveIden)]
enum Commits {
    Table,
    Hash,
    RepositoryId,
    RepositoryFullName,
    Date,
    Message,
    AuthorRaw,
    AuthorUuid,
    AuthorDisplayName,
    Parents,
    FirstSuccessfulBuildDate,
    FirstSuccessfulDeploymentDate,
}

#[derive(DeriveIden)]
enum Statuses {
    Table,
    Id,
    RepositoryId,
    CommitHash,
    Key,
    State,
    Name,
    Url,
    Description,
    CreatedOn,
    UpdatedOn,
}

#[derive(DeriveIden)]
enum Refs {
    Table,
    Id,
    RepositoryId,
    Kind,
    Name,
    TargetHash,
    TargetDate,
    Date,
    TaggerRaw,
    Message,
}

#[derive(DeriveIden)]
enum Deployments {
    Table,
    Id,
    RepositoryId,
    Project,
    Date,
    TagName,
    CommitHash,
    Author,
    Repository,
}
