use bitsync::DocumentStore;

pub(crate) async fn handle_reset(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = DocumentStore::connect(database_url).await?;

    println!("Dropping repositories, commits, statuses, refs and deployments...");
    store.reset().await?;
    println!("Reset complete. The next `bitsync start` mirrors everything again.");

    Ok(())
}
