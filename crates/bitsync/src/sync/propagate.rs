//! First-build and first-deployment date propagation.
//!
//! Both passes read qualifying events oldest first and stamp every ancestor
//! that is still unstamped. An earlier event therefore claims a commit before
//! a later one can reach it, and the set-once writes in the store keep a
//! stamp from a previous run.
//!
//! The store filters and orders the events, so a scan cut off at the ceiling
//! only drops the newest ones.

use regex::Regex;

use super::convert::deployment_model;
use super::error::Result;
use crate::entity::prelude::*;
use crate::store::{DatePatch, DocumentStore};

/// What a propagation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationOutcome {
    /// Qualifying events processed.
    pub events: usize,
    /// Commit rows stamped.
    pub stamped: u64,
}

/// Stamp `first_successful_build_date` from the repository's successful
/// build statuses.
pub async fn propagate_build_dates(
    store: &DocumentStore,
    repository_id: &str,
) -> Result<PropagationOutcome> {
    let statuses = store.get_successful_statuses(repository_id).await?;

    let mut outcome = PropagationOutcome::default();
    for (idx, status) in statuses.iter().enumerate() {
        let patch = DatePatch::build(status.updated_on);
        let hashes = store
            .get_commit_ancestors(&status.commit_hash, |c| {
                c.first_successful_build_date.is_none()
            })
            .await?;
        outcome.stamped += store.update_commits(&hashes, &patch).await?;
        outcome.events += 1;

        if idx == 0 {
            store
                .update_repositories(&[repository_id.to_string()], &patch)
                .await?;
        }
    }

    tracing::debug!(
        repository = %repository_id,
        statuses = outcome.events,
        stamped = outcome.stamped,
        "Propagated build dates"
    );
    Ok(outcome)
}

/// Stamp `first_successful_deployment_date` from dated tags whose name
/// matches `pattern`, and record one deployment per tag.
pub async fn propagate_deployment_dates(
    store: &DocumentStore,
    repository_id: &str,
    pattern: &Regex,
) -> Result<PropagationOutcome> {
    let Some(repository) = store.get_repository(repository_id).await? else {
        tracing::warn!(repository = %repository_id, "Repository not stored, skipping deployments");
        return Ok(PropagationOutcome::default());
    };

    let tags: Vec<GitRefModel> = store
        .get_dated_tags(repository_id)
        .await?
        .into_iter()
        .filter(|r| pattern.is_match(&r.name))
        .collect();

    let mut outcome = PropagationOutcome::default();
    let mut deployments = Vec::with_capacity(tags.len());
    for tag in &tags {
        let (Some(date), Some(target)) = (tag.date, tag.target_hash.as_deref()) else {
            continue;
        };

        let patch = DatePatch::deployment(date);
        let hashes = store
            .get_commit_ancestors(target, |c| c.first_successful_deployment_date.is_none())
            .await?;
        outcome.stamped += store.update_commits(&hashes, &patch).await?;

        if outcome.events == 0 {
            store
                .update_repositories(&[repository_id.to_string()], &patch)
                .await?;
        }
        outcome.events += 1;
        deployments.extend(deployment_model(tag, &repository));
    }
    store.save_deployments(deployments).await?;

    tracing::debug!(
        repository = %repository_id,
        tags = outcome.events,
        stamped = outcome.stamped,
        "Propagated deployment dates"
    );
    Ok(outcome)
}
