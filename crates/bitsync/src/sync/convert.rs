//! Remote payload to stored record conversion.

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use super::types::DEPLOYMENT_NAMESPACE;
use crate::bitbucket::{RemoteCommit, RemoteRef, RemoteRepository, RemoteStatus};
use crate::entity::prelude::*;

/// Bitbucket wraps UUIDs in braces: `{1c2d...}`.
pub fn strip_braces(uuid: &str) -> String {
    uuid.trim_start_matches('{').trim_end_matches('}').to_string()
}

pub fn repository_model(
    remote: &RemoteRepository,
    synced_at: DateTime<FixedOffset>,
) -> RepositoryModel {
    RepositoryModel {
        id: strip_braces(&remote.uuid),
        slug: remote.slug.clone(),
        name: remote.name.clone(),
        full_name: remote.full_name.clone(),
        owner: remote
            .owner
            .as_ref()
            .and_then(|o| o.login())
            .map(str::to_string),
        project: remote.project.as_ref().map(|p| p.key.clone()),
        mainbranch: remote.mainbranch.as_ref().map(|b| b.name.clone()),
        description: remote.description.clone(),
        language: remote.language.clone(),
        is_private: remote.is_private,
        size: remote.size,
        created_on: remote.created_on,
        updated_on: remote.updated_on,
        first_successful_build_date: None,
        first_successful_deployment_date: None,
        synced_at,
    }
}

pub fn commit_model(remote: &RemoteCommit, repository: &RepositoryModel) -> CommitModel {
    let author = remote.author.as_ref();
    let user = author.and_then(|a| a.user.as_ref());
    CommitModel {
        hash: remote.hash.clone(),
        repository_id: repository.id.clone(),
        repository_full_name: remote
            .repository
            .as_ref()
            .and_then(|r| r.full_name.clone())
            .or_else(|| repository.full_name.clone()),
        date: remote.date,
        message: remote.message.clone(),
        author_raw: author.and_then(|a| a.raw.clone()),
        author_uuid: user.and_then(|u| u.uuid.as_deref()).map(strip_braces),
        author_display_name: user.and_then(|u| u.display_name.clone()),
        parents: serde_json::Value::from(
            remote
                .parents
                .iter()
                .map(|p| p.hash.clone())
                .collect::<Vec<_>>(),
        ),
        first_successful_build_date: None,
        first_successful_deployment_date: None,
    }
}

/// The commit hash comes from the request path; the payload may omit it.
pub fn status_model(
    remote: &RemoteStatus,
    repository_id: &str,
    commit_hash: &str,
) -> BuildStatusModel {
    BuildStatusModel {
        id: BuildStatusModel::make_id(commit_hash, &remote.key),
        repository_id: repository_id.to_string(),
        commit_hash: commit_hash.to_string(),
        key: remote.key.clone(),
        state: BuildState::from_remote(&remote.state),
        name: remote.name.clone(),
        url: remote.url.clone(),
        description: remote.description.clone(),
        created_on: remote.created_on,
        updated_on: remote.updated_on,
    }
}

pub fn ref_model(remote: &RemoteRef, repository: &RepositoryModel) -> GitRefModel {
    let kind = RefKind::from_remote(&remote.kind);
    let is_tag = kind == RefKind::Tag;
    let full_name = repository.full_name.as_deref().unwrap_or(&repository.slug);
    GitRefModel {
        id: GitRefModel::make_id(full_name, &remote.name),
        repository_id: repository.id.clone(),
        kind,
        name: remote.name.clone(),
        target_hash: remote.target.as_ref().map(|t| t.hash.clone()),
        target_date: remote.target.as_ref().and_then(|t| t.date),
        date: remote.date.filter(|_| is_tag),
        tagger_raw: remote
            .tagger
            .as_ref()
            .and_then(|t| t.raw.clone())
            .filter(|_| is_tag),
        message: remote.message.clone().filter(|_| is_tag),
    }
}

/// Deployment record for a dated tag. `None` without a date or target.
pub fn deployment_model(tag: &GitRefModel, repository: &RepositoryModel) -> Option<DeploymentModel> {
    let date = tag.date?;
    let commit_hash = tag.target_hash.clone()?;
    Some(DeploymentModel {
        id: deployment_id(&tag.id, &commit_hash),
        repository_id: repository.id.clone(),
        project: repository.project.clone(),
        date,
        tag_name: tag.name.clone(),
        commit_hash,
        author: tag.tagger_raw.clone(),
        repository: serde_json::to_value(repository).unwrap_or_default(),
    })
}

/// Stable id: the same tag on the same commit always maps to one record.
pub fn deployment_id(ref_id: &str, commit_hash: &str) -> Uuid {
    Uuid::new_v5(
        &DEPLOYMENT_NAMESPACE,
        format!("{ref_id}:{commit_hash}").as_bytes(),
    )
}
