//! Bitbucket API response types.
//!
//! Only the fields the mirror keeps are declared; everything else in the
//! payload (`links`, `summary`, `type` tags, account ids) is ignored by serde.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// A user or team account as embedded in other payloads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteAccount {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl RemoteAccount {
    /// Best available login-style name.
    pub fn login(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or(self.nickname.as_deref())
            .or(self.display_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteProject {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteBranch {
    pub name: String,
}

/// Repository as returned by `GET /repositories/{account}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteRepository {
    /// Braced UUID, e.g. `{1c2d...}`.
    pub uuid: String,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub owner: Option<RemoteAccount>,
    #[serde(default)]
    pub project: Option<RemoteProject>,
    #[serde(default)]
    pub mainbranch: Option<RemoteBranch>,
    #[serde(default)]
    pub created_on: Option<DateTime<FixedOffset>>,
    pub updated_on: DateTime<FixedOffset>,
}

/// Lightweight repository reference embedded in commits and refs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteRepositoryLink {
    pub uuid: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteAuthor {
    /// `Name <email>` as recorded by git.
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub user: Option<RemoteAccount>,
}

/// A commit referenced only by hash (parents, status targets).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCommitLink {
    pub hash: String,
}

/// Commit as returned by `GET /repositories/{account}/{slug}/commits`.
///
/// The listing is ordered newest first.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCommit {
    pub hash: String,
    pub date: DateTime<FixedOffset>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<RemoteAuthor>,
    #[serde(default)]
    pub parents: Vec<RemoteCommitLink>,
    #[serde(default)]
    pub repository: Option<RemoteRepositoryLink>,
}

/// Build status as returned by `GET .../commit/{hash}/statuses`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteStatus {
    pub key: String,
    /// `SUCCESSFUL`, `FAILED`, `INPROGRESS` or `STOPPED`.
    pub state: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_on: Option<DateTime<FixedOffset>>,
    pub updated_on: DateTime<FixedOffset>,
    #[serde(default)]
    pub commit: Option<RemoteCommitLink>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteRefTarget {
    pub hash: String,
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub repository: Option<RemoteRepositoryLink>,
}

/// Branch or tag as returned by `GET .../refs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteRef {
    pub name: String,
    /// `branch` or `tag`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target: Option<RemoteRefTarget>,
    /// Tag creation date. Lightweight tags have none.
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub tagger: Option<RemoteAuthor>,
    #[serde(default)]
    pub message: Option<String>,
}
