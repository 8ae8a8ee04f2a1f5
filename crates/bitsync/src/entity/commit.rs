//! Commit entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub hash: String,
    /// Owning repository UUID.
    pub repository_id: String,
    pub repository_full_name: Option<String>,
    pub date: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub author_raw: Option<String>,
    pub author_uuid: Option<String>,
    pub author_display_name: Option<String>,
    /// Parent hashes in order, as a JSON array of strings.
    #[sea_orm(column_type = "Json")]
    pub parents: Json,
    pub first_successful_build_date: Option<DateTimeWithTimeZone>,
    pub first_successful_deployment_date: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parent hashes. Non-string entries are skipped.
    pub fn parent_hashes(&self) -> Vec<String> {
        self.parents
            .as_array()
            .map(|parents| {
                parents
                    .iter()
                    .filter_map(|p| p.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
