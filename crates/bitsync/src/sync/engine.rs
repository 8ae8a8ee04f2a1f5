//! Sync orchestration.
//!
//! One run authenticates, provisions the store, finds the repositories whose
//! remote `updated_on` moved past the stored one, and processes each of them
//! as an independent job on the `process-repository` queue:
//!
//! 1. Read the stored `updated_on` as the watermark.
//! 2. Fetch commits newer than the watermark and all refs, concurrently.
//!    Statuses are fetched for every new commit.
//! 3. Save the repository record. Its `updated_on` becomes the next watermark,
//!    so it is only written once everything it covers is stored.
//! 4. Propagate first build dates, then first deployment dates.
//!
//! A failed job does not stop the others; failures are collected and
//! reported once every job has settled.

use chrono::{DateTime, FixedOffset, Utc};
use tokio::task::JoinSet;

use super::convert::{commit_model, ref_model, repository_model, status_model};
use super::error::{Result, SyncError};
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::propagate::{propagate_build_dates, propagate_deployment_dates};
use super::types::{RepositorySyncStats, SyncOptions, SyncReport};
use crate::bitbucket::{BitbucketClient, RemoteRepository};
use crate::entity::prelude::RepositoryModel;
use crate::pagination::Page;
use crate::queue::{Queue, QueueRegistry, names};
use crate::store::DocumentStore;

/// Runs sync passes for one account. Cheap to clone.
#[derive(Clone)]
pub struct Synchronizer {
    client: BitbucketClient,
    store: DocumentStore,
    jobs: Queue,
    options: SyncOptions,
    on_progress: Option<ProgressCallback>,
}

impl Synchronizer {
    pub fn new(
        client: BitbucketClient,
        store: DocumentStore,
        registry: &QueueRegistry,
        options: SyncOptions,
    ) -> Result<Self> {
        let jobs = registry.get_queue(names::PROCESS_REPOSITORY, options.repository_queue.clone())?;
        Ok(Self {
            client,
            store,
            jobs,
            options,
            on_progress: None,
        })
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Run one full sync.
    ///
    /// # Errors
    /// Authentication, provisioning and discovery errors end the run
    /// immediately. Job errors are collected into
    /// [`SyncError::PartialFailure`] after every job has finished.
    pub async fn execute(&self) -> Result<SyncReport> {
        let account = self.client.account().to_string();

        if self.client.has_credentials() {
            self.client.authenticate().await?;
            self.emit(SyncProgress::Authenticated {
                account: account.clone(),
            });
        }

        self.store.setup().await?;
        self.emit(SyncProgress::StoreReady);

        let outdated = self.outdated_repositories().await?;
        let mut report = SyncReport {
            outdated: outdated.iter().map(|r| r.slug.clone()).collect(),
            ..SyncReport::default()
        };
        tracing::info!(%account, outdated = outdated.len(), "Scheduling repository jobs");

        let mut jobs = JoinSet::new();
        for remote in outdated {
            let this = self.clone();
            jobs.spawn(async move {
                let slug = remote.slug.clone();
                let result = match this.jobs.add(this.process_repository(remote)).await {
                    Ok(result) => result,
                    Err(e) => Err(SyncError::from(e)),
                };
                (slug, result)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((slug, Ok(stats))) => {
                    tracing::info!(
                        repository = %slug,
                        commits = stats.commits,
                        statuses = stats.statuses,
                        refs = stats.refs,
                        "Repository synchronized"
                    );
                    self.emit(SyncProgress::RepositoryFinished { slug: slug.clone() });
                    report.synchronized.push(slug);
                }
                Ok((slug, Err(e))) => {
                    tracing::warn!(repository = %slug, error = %e, "Repository sync failed");
                    self.emit(SyncProgress::RepositoryFailed {
                        slug: slug.clone(),
                        error: e.to_string(),
                    });
                    report.failed.push((slug, e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Repository job aborted");
                    report.failed.push(("<aborted>".to_string(), e.to_string()));
                }
            }
        }

        self.emit(SyncProgress::Complete {
            synchronized: report.synchronized.len(),
            failed: report.failed.len(),
        });

        if !report.failed.is_empty() {
            return Err(SyncError::PartialFailure {
                succeeded: report.synchronized.len(),
                failed: report.failed.len(),
                errors: report
                    .failed
                    .iter()
                    .map(|(slug, error)| format!("{slug}: {error}"))
                    .collect(),
            });
        }

        tracing::info!(
            %account,
            synchronized = report.synchronized.len(),
            "Sync complete"
        );
        Ok(report)
    }

    /// Remote repositories that are missing locally or updated since the
    /// last sync.
    pub async fn outdated_repositories(&self) -> Result<Vec<RemoteRepository>> {
        self.emit(SyncProgress::DiscoveringRepositories {
            account: self.client.account().to_string(),
        });

        let mut iterator = self.client.repositories()?;
        let mut total = 0;
        let mut outdated = Vec::new();
        while let Page::Item(page) = iterator.next().await? {
            total += page.values.len();
            for remote in page.values {
                let id = super::convert::strip_braces(&remote.uuid);
                let stored = self.store.get_repository(&id).await?;
                if is_outdated(&remote, stored.as_ref()) {
                    outdated.push(remote);
                }
            }
        }

        self.emit(SyncProgress::OutdatedRepositories {
            total,
            outdated: outdated.len(),
        });
        Ok(outdated)
    }

    /// Sync one repository and run both propagation passes.
    pub async fn process_repository(&self, remote: RemoteRepository) -> Result<RepositorySyncStats> {
        let repository = repository_model(&remote, Utc::now().fixed_offset());
        let watermark = self
            .store
            .get_repository(&repository.id)
            .await?
            .map(|stored| stored.updated_on);

        tracing::debug!(repository = %repository.slug, watermark = ?watermark, "Processing repository");
        self.emit(SyncProgress::RepositoryStarted {
            slug: repository.slug.clone(),
            watermark: watermark.map(|w| w.to_rfc3339()),
        });

        let ((commits, statuses), refs) = tokio::try_join!(
            self.sync_commits(&repository, watermark),
            self.sync_refs(&repository),
        )?;
        self.emit(SyncProgress::RepositoryFetched {
            slug: repository.slug.clone(),
            commits,
            statuses,
            refs,
        });

        self.store.save_repositories(vec![repository.clone()]).await?;

        let builds = propagate_build_dates(&self.store, &repository.id).await?;
        self.emit(SyncProgress::BuildDatesPropagated {
            slug: repository.slug.clone(),
            stamped: builds.stamped,
        });

        let deployments = propagate_deployment_dates(
            &self.store,
            &repository.id,
            &self.options.deployment_tags,
        )
        .await?;
        self.emit(SyncProgress::DeploymentDatesPropagated {
            slug: repository.slug.clone(),
            stamped: deployments.stamped,
            deployments: deployments.events,
        });

        Ok(RepositorySyncStats {
            commits,
            statuses,
            refs,
            build_stamped: builds.stamped,
            deployment_stamped: deployments.stamped,
            deployments: deployments.events,
        })
    }

    /// Save commits newer than `watermark`, then their statuses.
    ///
    /// Returns the number of commits and statuses saved.
    async fn sync_commits(
        &self,
        repository: &RepositoryModel,
        watermark: Option<DateTime<FixedOffset>>,
    ) -> Result<(usize, usize)> {
        let mut iterator = self.client.commits(&repository.slug, watermark)?;
        let mut new_hashes = Vec::new();

        while let Page::Item(page) = iterator.next().await? {
            let fresh: Vec<_> = page
                .values
                .iter()
                .filter(|c| watermark.is_none_or(|w| c.date > w))
                .map(|c| commit_model(c, repository))
                .collect();
            new_hashes.extend(fresh.iter().map(|c| c.hash.clone()));
            self.store.save_commits(fresh).await?;
        }

        let statuses = self.sync_statuses(repository, &new_hashes).await?;
        Ok((new_hashes.len(), statuses))
    }

    /// Save the statuses of each commit. Fetches run concurrently, bounded by
    /// the statuses queue.
    async fn sync_statuses(&self, repository: &RepositoryModel, hashes: &[String]) -> Result<usize> {
        let mut fetches = JoinSet::new();
        for hash in hashes {
            let client = self.client.clone();
            let store = self.store.clone();
            let slug = repository.slug.clone();
            let repository_id = repository.id.clone();
            let hash = hash.clone();
            fetches.spawn(async move {
                let values = client.statuses(&slug, &hash)?.collect_values().await?;
                let models: Vec<_> = values
                    .iter()
                    .map(|s| status_model(s, &repository_id, &hash))
                    .collect();
                let count = models.len();
                store.save_statuses(models).await?;
                Ok::<usize, SyncError>(count)
            });
        }

        let mut saved = 0;
        let mut first_error = None;
        while let Some(joined) = fetches.join_next().await {
            match joined? {
                Ok(count) => saved += count,
                Err(e) => {
                    tracing::debug!(repository = %repository.slug, error = %e, "Status fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }

    /// Save every branch and tag. Returns the number saved.
    async fn sync_refs(&self, repository: &RepositoryModel) -> Result<usize> {
        let mut iterator = self.client.refs(&repository.slug)?;
        let mut saved = 0;
        while let Page::Item(page) = iterator.next().await? {
            let models: Vec<_> = page
                .values
                .iter()
                .map(|r| ref_model(r, repository))
                .collect();
            saved += models.len();
            self.store.save_refs(models).await?;
        }
        Ok(saved)
    }

    fn emit(&self, event: SyncProgress) {
        emit(self.on_progress.as_ref(), event);
    }
}

/// No stored record, or the remote one was updated after it.
pub fn is_outdated(remote: &RemoteRepository, stored: Option<&RepositoryModel>) -> bool {
    stored.is_none_or(|stored| remote.updated_on > stored.updated_on)
}
