//! Repository entity - one row per mirrored Bitbucket repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Repository UUID without braces.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    // ─── Naming ──────────────────────────────────────────────────────────────
    pub slug: String,
    pub name: Option<String>,
    /// `owner/slug`.
    pub full_name: Option<String>,
    /// Owner login.
    pub owner: Option<String>,
    /// Project key.
    pub project: Option<String>,
    /// Main branch name.
    pub mainbranch: Option<String>,

    // ─── Content ─────────────────────────────────────────────────────────────
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub language: Option<String>,
    pub is_private: Option<bool>,
    pub size: Option<i64>,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub created_on: Option<DateTimeWithTimeZone>,
    /// Last remote update. Doubles as the sync watermark.
    pub updated_on: DateTimeWithTimeZone,

    // ─── Derived ─────────────────────────────────────────────────────────────
    /// Set once, never overwritten.
    pub first_successful_build_date: Option<DateTimeWithTimeZone>,
    /// Set once, never overwritten.
    pub first_successful_deployment_date: Option<DateTimeWithTimeZone>,

    /// When this record was last written by a sync.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
