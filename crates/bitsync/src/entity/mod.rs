//! SeaORM entity definitions for the five mirrored collections.

pub mod build_state;
pub mod build_status;
pub mod commit;
pub mod deployment;
pub mod git_ref;
pub mod prelude;
pub mod ref_kind;
pub mod repository;
