use bitsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::Authenticated { account } => {
                tracing::info!(account = %account, "Authenticated with Bitbucket");
            }

            SyncProgress::StoreReady => {
                tracing::debug!("Store collections ready");
            }

            SyncProgress::DiscoveringRepositories { account } => {
                tracing::info!(account = %account, "Discovering repositories");
            }

            SyncProgress::OutdatedRepositories { total, outdated } => {
                tracing::info!(total, outdated, "Found outdated repositories");
            }

            SyncProgress::RepositoryStarted { slug, watermark } => {
                tracing::debug!(repository = %slug, watermark = ?watermark, "Synchronizing repository");
            }

            SyncProgress::RepositoryFetched {
                slug,
                commits,
                statuses,
                refs,
            } => {
                tracing::debug!(repository = %slug, commits, statuses, refs, "Fetched repository data");
            }

            SyncProgress::BuildDatesPropagated { slug, stamped } => {
                tracing::debug!(repository = %slug, stamped, "Propagated first build dates");
            }

            SyncProgress::DeploymentDatesPropagated {
                slug,
                stamped,
                deployments,
            } => {
                tracing::debug!(repository = %slug, stamped, deployments, "Propagated first deployment dates");
            }

            SyncProgress::RepositoryFinished { slug } => {
                tracing::info!(repository = %slug, "Repository done");
            }

            SyncProgress::RepositoryFailed { slug, error } => {
                tracing::error!(repository = %slug, error = %error, "Repository failed");
            }

            SyncProgress::Complete {
                synchronized,
                failed,
            } => {
                tracing::info!(synchronized, failed, "Sync run finished");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
