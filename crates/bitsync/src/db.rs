//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Pragmas applied to file-backed SQLite stores.
///
/// WAL lets readers proceed while a sync job writes, and the busy timeout
/// absorbs lock contention between concurrent repository jobs.
const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma))
            .await?;
    }
    Ok(())
}

fn is_file_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:") && !database_url.contains(":memory:")
}

/// Establish a connection to the document store database.
///
/// File-backed SQLite connections get WAL mode, a 5 second busy timeout and
/// `synchronous=NORMAL`.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    if is_file_sqlite(database_url) {
        configure_sqlite(&db).await?;
    }
    tracing::debug!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}
