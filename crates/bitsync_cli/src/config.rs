//! Configuration file support for bitsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Environment variables (prefixed with `BITSYNC_`, nested keys joined with
//!    `__`, e.g., `BITSYNC_BITBUCKET__ACCOUNT`)
//! 2. Local config file (./bitsync.toml)
//! 3. XDG config file (~/.config/bitsync/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/bitsync/bitsync.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [bitbucket]
//! account = "acme"
//! client_id = "..."      # or use BITSYNC_BITBUCKET__CLIENT_ID
//! client_secret = "..."  # or use BITSYNC_BITBUCKET__CLIENT_SECRET
//! timeout_ms = 10000
//!
//! [bitbucket.queues.statuses]
//! concurrency = 50
//! interval_cap = 900
//! interval_ms = 3600000
//!
//! [database]
//! url = "postgres://bitsync@localhost/bitsync"
//!
//! [analytics]
//! deployment_tags_pattern = "v.+"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use bitsync::bitbucket::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use bitsync::bitbucket::oauth::DEFAULT_TOKEN_URL;
use bitsync::sync::{
    DEFAULT_DEPLOYMENT_TAGS_PATTERN, DEFAULT_REPOSITORY_CONCURRENCY, SyncError, SyncOptions,
};
use bitsync::{BitbucketConfig, QueueOptions, ResourceQueues};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bitbucket account, credentials and request queues.
    pub bitbucket: BitbucketSection,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Derived-date settings.
    pub analytics: AnalyticsConfig,
}

/// Bitbucket configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BitbucketSection {
    /// Workspace, team or user whose repositories are mirrored.
    pub account: String,
    /// OAuth consumer key. Requests are anonymous unless both halves are set.
    pub client_id: Option<String>,
    /// OAuth consumer secret.
    pub client_secret: Option<String>,
    pub api_url: String,
    pub token_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    pub queues: QueuesConfig,
}

impl Default for BitbucketSection {
    fn default() -> Self {
        Self {
            account: String::new(),
            client_id: None,
            client_secret: None,
            api_url: DEFAULT_API_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            queues: QueuesConfig::default(),
        }
    }
}

/// One section per named queue.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueuesConfig {
    pub process_repository: QueueConfig,
    pub repositories: QueueConfig,
    pub commits: QueueConfig,
    pub statuses: QueueConfig,
    pub refs: QueueConfig,
}

/// Admission limits for a single queue.
///
/// Unset fields fall back to the queue's built-in default, so a section that
/// only sets `interval_cap` keeps the default concurrency.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Tasks in flight. `0` means unbounded.
    pub concurrency: Option<usize>,
    /// Tasks started per `interval_ms` window.
    pub interval_cap: Option<u32>,
    pub interval_ms: Option<u64>,
}

impl QueueConfig {
    /// Overlay these settings on `defaults`.
    pub fn to_options(&self, defaults: QueueOptions) -> QueueOptions {
        let mut options = defaults;
        if let Some(concurrency) = self.concurrency {
            options.concurrency = Some(concurrency);
        }
        if let (Some(cap), Some(ms)) = (self.interval_cap, self.interval_ms) {
            options = options.interval_cap(cap, Duration::from_millis(ms));
        } else if self.interval_cap.is_some() || self.interval_ms.is_some() {
            tracing::warn!("Ignoring queue interval settings: interval_cap and interval_ms must be set together");
        }
        options
    }
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    /// Defaults to `sqlite://~/.local/state/bitsync/bitsync.db` if not specified.
    pub url: Option<String>,
}

/// Settings for the derived timeline dates.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Tags whose name matches this pattern count as deployments.
    pub deployment_tags_pattern: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            deployment_tags_pattern: DEFAULT_DEPLOYMENT_TAGS_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/bitsync/config.toml)
    /// 3. Local config file (./bitsync.toml)
    /// 4. Environment variables with BITSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("bitsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./bitsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., BITSYNC_BITBUCKET__CLIENT_ID -> bitbucket.client_id
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("BITSYNC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter enables read-write access and creates the file
    /// if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("bitsync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Client configuration for the Bitbucket API.
    pub fn bitbucket_config(&self) -> BitbucketConfig {
        let section = &self.bitbucket;
        let queues = &section.queues;
        let defaults = ResourceQueues::default();

        let mut config = BitbucketConfig::new(section.account.trim());
        config.client_id = section.client_id.clone();
        config.client_secret = section.client_secret.clone();
        config.api_url = section.api_url.clone();
        config.token_url = section.token_url.clone();
        config.timeout = Duration::from_millis(section.timeout_ms);
        config.queues = ResourceQueues {
            repositories: queues.repositories.to_options(defaults.repositories),
            commits: queues.commits.to_options(defaults.commits),
            statuses: queues.statuses.to_options(defaults.statuses),
            refs: queues.refs.to_options(defaults.refs),
        };
        config
    }

    /// Options for the sync run.
    ///
    /// # Errors
    /// Fails when the deployment tag pattern is not a valid regex.
    pub fn sync_options(&self) -> Result<SyncOptions, SyncError> {
        let jobs = self
            .bitbucket
            .queues
            .process_repository
            .to_options(QueueOptions::with_concurrency(DEFAULT_REPOSITORY_CONCURRENCY));
        Ok(SyncOptions::default()
            .with_deployment_tags(&self.analytics.deployment_tags_pattern)?
            .with_repository_queue(jobs))
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bitsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/bitsync` or `~/.local/state/bitsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bitsync").map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

/// Path of the database file behind an SQLite URL, if it names one.
pub fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}
