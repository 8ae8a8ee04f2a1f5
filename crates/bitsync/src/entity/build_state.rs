//! Build status state as reported by Bitbucket.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum BuildState {
    #[sea_orm(string_value = "SUCCESSFUL")]
    Successful,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "INPROGRESS")]
    InProgress,
    #[sea_orm(string_value = "STOPPED")]
    Stopped,
    /// Any state this version does not know about.
    #[sea_orm(string_value = "UNKNOWN")]
    Unknown,
}

impl BuildState {
    /// Parse the API's upper-case state string.
    pub fn from_remote(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "SUCCESSFUL" => Self::Successful,
            "FAILED" => Self::Failed,
            "INPROGRESS" => Self::InProgress,
            "STOPPED" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildState::Successful => write!(f, "SUCCESSFUL"),
            BuildState::Failed => write!(f, "FAILED"),
            BuildState::InProgress => write!(f, "INPROGRESS"),
            BuildState::Stopped => write!(f, "STOPPED"),
            BuildState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
