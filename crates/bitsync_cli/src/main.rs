//! Bitsync CLI - mirror a Bitbucket account and derive commit timelines.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bitsync")]
#[command(version)]
#[command(about = "Incremental Bitbucket mirror with build and deployment timelines")]
#[command(
    long_about = "Bitsync mirrors the repositories, commits, build statuses and refs of a \
Bitbucket account into a local database. It stamps every commit with the date of its \
first successful build and the date of its first deployment (a tag matching the \
deployment pattern). Repeated runs only fetch what changed since the last run."
)]
#[command(after_long_help = r#"EXAMPLES
    Mirror an account:
        $ BITSYNC_BITBUCKET__ACCOUNT=acme bitsync start

    Start over from an empty store:
        $ bitsync reset && bitsync start

CONFIGURATION
    Bitsync reads configuration from (later sources win):
      1. ~/.config/bitsync/config.toml (or $XDG_CONFIG_HOME/bitsync/config.toml)
      2. ./bitsync.toml
      3. Environment variables (BITSYNC_ prefix, nested keys joined with __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    BITSYNC_BITBUCKET__ACCOUNT         Workspace, team or user to mirror
    BITSYNC_BITBUCKET__CLIENT_ID       OAuth consumer key
    BITSYNC_BITBUCKET__CLIENT_SECRET   OAuth consumer secret
    BITSYNC_DATABASE__URL              Database connection string (default: ~/.local/state/bitsync/bitsync.db)
    BITSYNC_ANALYTICS__DEPLOYMENT_TAGS_PATTERN
                                       Tags matching this regex are deployments (default: v.+)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one incremental sync
    Start,
    /// Drop every mirrored collection
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Progress bars own the terminal; only warnings are logged over them.
    let default_filter = if Term::stdout().is_term() {
        "bitsync=warn,bitsync_cli=warn"
    } else {
        "bitsync=info,bitsync_cli=info"
    };
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_filter),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set BITSYNC_DATABASE__URL")?;

    // Ensure the database directory exists for SQLite
    if let Some(db_path) = config::sqlite_file_path(&database_url) {
        // Warn if using a relative path (can cause issues depending on cwd)
        if db_path.is_relative() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Start => commands::start::handle_start(&config, &database_url).await?,
        Commands::Reset => commands::reset::handle_reset(&database_url).await?,
    }

    Ok(())
}
