//! Common re-exports for convenient entity usage.

pub use super::build_state::BuildState;
pub use super::build_status::{
    ActiveModel as BuildStatusActiveModel, Column as BuildStatusColumn, Entity as BuildStatus,
    Model as BuildStatusModel,
};
pub use super::commit::{
    ActiveModel as CommitActiveModel, Column as CommitColumn, Entity as Commit,
    Model as CommitModel,
};
pub use super::deployment::{
    ActiveModel as DeploymentActiveModel, Column as DeploymentColumn, Entity as Deployment,
    Model as DeploymentModel,
};
pub use super::git_ref::{
    ActiveModel as GitRefActiveModel, Column as GitRefColumn, Entity as GitRef,
    Model as GitRefModel,
};
pub use super::ref_kind::RefKind;
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
