//! Build status entity. A commit may carry several named checks.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::build_state::BuildState;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "statuses")]
pub struct Model {
    /// `{commit_hash}-{key}`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub repository_id: String,
    pub commit_hash: String,
    pub key: String,
    pub state: BuildState,
    pub name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_on: Option<DateTimeWithTimeZone>,
    pub updated_on: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn make_id(commit_hash: &str, key: &str) -> String {
        format!("{commit_hash}-{key}")
    }
}
