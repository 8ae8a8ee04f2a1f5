//! Deployment entity - one row per qualifying deployment tag.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deployments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repository_id: String,
    /// Project key of the repository at deployment time.
    pub project: Option<String>,
    /// Date of the tag that marks the deployment.
    pub date: DateTimeWithTimeZone,
    pub tag_name: String,
    pub commit_hash: String,
    /// Tagger, as recorded by git.
    pub author: Option<String>,
    /// Snapshot of the repository record.
    #[sea_orm(column_type = "Json")]
    pub repository: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
