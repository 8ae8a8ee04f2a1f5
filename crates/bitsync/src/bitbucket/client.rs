//! Bitbucket API client creation and iterator factories.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use url::Url;

use super::error::{BitbucketError, Result};
use super::oauth::{self, DEFAULT_TOKEN_URL};
use super::types::{RemoteCommit, RemoteRef, RemoteRepository, RemoteStatus};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpTransport, JsonClient};
use crate::pagination::{PageIterator, PageState};
use crate::queue::{Queue, QueueOptions, QueueRegistry, names};

/// Bitbucket Cloud API root.
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";

/// Page size requested on the first page of every listing.
pub const DEFAULT_PAGE_LEN: u32 = 100;

/// Per-request transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Queue settings for each remote resource class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQueues {
    pub repositories: QueueOptions,
    pub commits: QueueOptions,
    /// One request per commit, so this is the widest queue.
    pub statuses: QueueOptions,
    pub refs: QueueOptions,
}

impl Default for ResourceQueues {
    fn default() -> Self {
        Self {
            repositories: QueueOptions::with_concurrency(5),
            commits: QueueOptions::with_concurrency(5),
            statuses: QueueOptions::with_concurrency(50),
            refs: QueueOptions::with_concurrency(5),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct BitbucketConfig {
    /// Workspace/team/user whose repositories are mirrored.
    pub account: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_url: String,
    pub token_url: String,
    pub timeout: Duration,
    pub queues: ResourceQueues,
}

impl BitbucketConfig {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            client_id: None,
            client_secret: None,
            api_url: DEFAULT_API_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            queues: ResourceQueues::default(),
        }
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Client id and secret, if both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().filter(|s| !s.is_empty())?;
        let secret = self.client_secret.as_deref().filter(|s| !s.is_empty())?;
        Some((id, secret))
    }
}

/// Bitbucket API client.
///
/// Cheap to clone; clones share the bearer token and the queues.
#[derive(Clone)]
pub struct BitbucketClient {
    http: JsonClient,
    account: String,
    api_url: Url,
    token_url: String,
    credentials: Option<(String, String)>,
    repositories_queue: Queue,
    commits_queue: Queue,
    statuses_queue: Queue,
    refs_queue: Queue,
}

impl BitbucketClient {
    /// Create a client backed by reqwest.
    pub fn new(config: BitbucketConfig, registry: &QueueRegistry) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout)
            .map_err(|e| BitbucketError::Config(e.to_string()))?;
        Self::new_with_transport(config, registry, Arc::new(transport))
    }

    pub fn new_with_transport(
        config: BitbucketConfig,
        registry: &QueueRegistry,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let account = config.account.trim();
        if account.is_empty() {
            return Err(BitbucketError::required("account"));
        }

        let api_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| BitbucketError::Config(format!("{}: {e}", config.api_url)))?;
        if api_url.cannot_be_a_base() {
            return Err(BitbucketError::Config(format!(
                "{} cannot be used as an API base URL",
                config.api_url
            )));
        }

        let credentials = config
            .credentials()
            .map(|(id, secret)| (id.to_string(), secret.to_string()));

        Ok(Self {
            http: JsonClient::new(transport),
            account: account.to_string(),
            api_url,
            token_url: config.token_url.clone(),
            credentials,
            repositories_queue: registry
                .get_queue(names::REPOSITORIES, config.queues.repositories.clone())?,
            commits_queue: registry.get_queue(names::COMMITS, config.queues.commits.clone())?,
            statuses_queue: registry.get_queue(names::STATUSES, config.queues.statuses.clone())?,
            refs_queue: registry.get_queue(names::REFS, config.queues.refs.clone())?,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Exchange the configured client credentials for a bearer token and
    /// attach it to every subsequent request, including requests made by
    /// iterators created before this call.
    pub async fn authenticate(&self) -> Result<()> {
        let Some((client_id, client_secret)) = &self.credentials else {
            return Err(BitbucketError::InvalidArgument(
                "client_id and client_secret are required for authentication".to_string(),
            ));
        };

        let token = oauth::client_credentials(
            self.http.transport().as_ref(),
            &self.token_url,
            client_id,
            client_secret,
        )
        .await?;

        self.http.set_bearer_token(token.access_token);
        tracing::info!(account = %self.account, expires_in = ?token.expires_in, "Authenticated");
        Ok(())
    }

    /// Repositories of the account, most recently updated first.
    pub fn repositories(&self) -> Result<PageIterator<RemoteRepository>> {
        let url = self.endpoint(&["repositories", &self.account], &[("sort", "-updated_on")])?;
        Ok(PageIterator::new(
            self.repositories_queue.clone(),
            self.http.clone(),
            url,
        ))
    }

    /// Commits of a repository, newest first.
    ///
    /// With `min_date`, pagination stops after the first page whose oldest
    /// commit is at or before that date; older pages cannot hold newer commits.
    pub fn commits(
        &self,
        repo_slug: &str,
        min_date: Option<DateTime<FixedOffset>>,
    ) -> Result<PageIterator<RemoteCommit>> {
        let repo_slug = require(repo_slug, "repo slug")?;
        let url = self.endpoint(&["repositories", &self.account, repo_slug, "commits"], &[])?;
        let iterator = PageIterator::new(self.commits_queue.clone(), self.http.clone(), url);

        let Some(watermark) = min_date else {
            return Ok(iterator);
        };

        let slug = repo_slug.to_string();
        Ok(iterator.with_interceptor(move |state: &mut PageState<RemoteCommit>| {
            let oldest = state
                .current
                .as_ref()
                .and_then(|page| page.values.iter().map(|c| c.date).min());
            if let Some(oldest) = oldest
                && oldest <= watermark
                && state.next_url.take().is_some()
            {
                tracing::debug!(
                    repository = %slug,
                    %oldest,
                    %watermark,
                    "Reached watermark, not fetching older commits"
                );
            }
        }))
    }

    /// Build statuses attached to one commit.
    pub fn statuses(
        &self,
        repo_slug: &str,
        commit_hash: &str,
    ) -> Result<PageIterator<RemoteStatus>> {
        let repo_slug = require(repo_slug, "repo slug")?;
        let commit_hash = require(commit_hash, "commit hash")?;
        let url = self.endpoint(
            &[
                "repositories",
                &self.account,
                repo_slug,
                "commit",
                commit_hash,
                "statuses",
            ],
            &[],
        )?;
        Ok(PageIterator::new(
            self.statuses_queue.clone(),
            self.http.clone(),
            url,
        ))
    }

    /// Branches and tags of a repository.
    pub fn refs(&self, repo_slug: &str) -> Result<PageIterator<RemoteRef>> {
        let repo_slug = require(repo_slug, "repo slug")?;
        let url = self.endpoint(&["repositories", &self.account, repo_slug, "refs"], &[])?;
        Ok(PageIterator::new(
            self.refs_queue.clone(),
            self.http.clone(),
            url,
        ))
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<String> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| BitbucketError::Config(format!("{} cannot be a base", self.api_url)))?
            .pop_if_empty()
            .extend(segments);

        let page_len = DEFAULT_PAGE_LEN.to_string();
        url.query_pairs_mut()
            .extend_pairs(query)
            .append_pair("pagelen", &page_len);
        Ok(url.to_string())
    }
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BitbucketError::required(what));
    }
    Ok(trimmed)
}
