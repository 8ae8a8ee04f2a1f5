//! Sync options, report and constants.

use regex::Regex;

use super::error::{Result, SyncError};
use crate::queue::QueueOptions;

/// Default concurrency of the per-repository job queue.
pub const DEFAULT_REPOSITORY_CONCURRENCY: usize = 10;

/// Default pattern a tag name must match to count as a deployment.
pub const DEFAULT_DEPLOYMENT_TAGS_PATTERN: &str = "v.+";

/// Namespace for deployment record ids.
pub(crate) const DEPLOYMENT_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x5b, 0x1e, 0x0c, 0x3a, 0x8f, 0x47, 0x4d, 0x0b, 0x9a, 0x2e, 0x64, 0xd1, 0x7c, 0x30, 0x55, 0xe9,
]);

/// Options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Tag names matching this pattern mark deployments.
    pub deployment_tags: Regex,
    /// Limits on the per-repository job queue.
    pub repository_queue: QueueOptions,
}

impl SyncOptions {
    /// Compile `pattern` as the deployment tag filter.
    ///
    /// The pattern is matched anywhere in the tag name unless it is anchored.
    pub fn with_deployment_tags(mut self, pattern: &str) -> Result<Self> {
        self.deployment_tags = Regex::new(pattern).map_err(|e| {
            SyncError::InvalidArgument(format!("invalid deployment tag pattern {pattern:?}: {e}"))
        })?;
        Ok(self)
    }

    pub fn with_repository_queue(mut self, options: QueueOptions) -> Self {
        self.repository_queue = options;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            deployment_tags: Regex::new(DEFAULT_DEPLOYMENT_TAGS_PATTERN)
                .expect("Invalid default deployment tag pattern"),
            repository_queue: QueueOptions::with_concurrency(DEFAULT_REPOSITORY_CONCURRENCY),
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Slugs found outdated and scheduled.
    pub outdated: Vec<String>,
    /// Slugs whose job finished.
    pub synchronized: Vec<String>,
    /// Slugs whose job failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What one repository job wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositorySyncStats {
    pub commits: usize,
    pub statuses: usize,
    pub refs: usize,
    /// Commits stamped with a first build date.
    pub build_stamped: u64,
    /// Commits stamped with a first deployment date.
    pub deployment_stamped: u64,
    pub deployments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_matches_version_tags() {
        let options = SyncOptions::default();
        assert!(options.deployment_tags.is_match("v1.2.3"));
        assert!(!options.deployment_tags.is_match("release"));
        assert!(!options.deployment_tags.is_match("v"));
        assert_eq!(
            options.repository_queue.concurrency,
            Some(DEFAULT_REPOSITORY_CONCURRENCY)
        );
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = SyncOptions::default()
            .with_deployment_tags("v(")
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[test]
    fn deployment_namespace_is_stable() {
        let a = uuid::Uuid::new_v5(&DEPLOYMENT_NAMESPACE, b"acme/widgets#v1.0.0:abc");
        let b = uuid::Uuid::new_v5(&DEPLOYMENT_NAMESPACE, b"acme/widgets#v1.0.0:abc");
        assert_eq!(a, b);
    }
}
