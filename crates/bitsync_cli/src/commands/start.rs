use std::sync::Arc;

use bitsync::sync::{SyncError, SyncReport, Synchronizer};
use bitsync::queue::names;
use bitsync::{BitbucketClient, DocumentStore, QueueRegistry};

use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown;

pub(crate) async fn handle_start(
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = QueueRegistry::global();
    let client = BitbucketClient::new(config.bitbucket_config(), registry)?;
    let store = DocumentStore::connect(database_url).await?;
    let options = config.sync_options()?;

    let reporter = Arc::new(ProgressReporter::new());
    let synchronizer =
        Synchronizer::new(client, store, registry, options)?.with_progress(reporter.as_callback());

    let run = synchronizer.execute();
    tokio::pin!(run);
    let result = tokio::select! {
        result = &mut run => result,
        () = shutdown::interrupted() => {
            // Repositories not yet started fail fast; running ones finish.
            registry.close(names::PROCESS_REPOSITORY);
            run.await
        }
    };
    reporter.finish();

    match result {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(SyncError::PartialFailure {
            succeeded,
            failed,
            errors,
        }) => {
            for error in &errors {
                tracing::error!(error = %error, "Repository failed");
            }
            println!();
            println!("Synchronized: {succeeded}");
            println!("Failed:       {failed}");
            Err(SyncError::PartialFailure {
                succeeded,
                failed,
                errors,
            }
            .into())
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync failed");
            Err(e.into())
        }
    }
}

fn print_summary(report: &SyncReport) {
    println!();
    if report.outdated.is_empty() {
        println!("Everything is up to date.");
        return;
    }
    println!("Synchronized: {}", report.synchronized.len());
    for slug in &report.synchronized {
        println!("  {slug}");
    }
}
