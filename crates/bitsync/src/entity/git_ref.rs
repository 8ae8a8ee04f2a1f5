//! Branch and tag entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::ref_kind::RefKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refs")]
pub struct Model {
    /// `{repository full name}#{ref name}`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub repository_id: String,
    pub kind: RefKind,
    pub name: String,
    pub target_hash: Option<String>,
    pub target_date: Option<DateTimeWithTimeZone>,
    /// Tag creation date. Branches and lightweight tags have none.
    pub date: Option<DateTimeWithTimeZone>,
    pub tagger_raw: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn make_id(repository_full_name: &str, name: &str) -> String {
        format!("{repository_full_name}#{name}")
    }
}
