use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DbError;

/// Open a pool against the control-plane store.
///
/// Status reports are short and infrequent, so the pool stays small. The
/// busy timeout lets several agents share one SQLite file.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // an in-memory database exists per connection
    let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    debug!(url = %database_url, max_connections, "Control-plane pool created");
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Create the pool and bring the schema up to date.
pub async fn connect(database_url: &str) -> Result<SqlitePool, DbError> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    info!(url = %database_url, "Control-plane store ready");
    Ok(pool)
}
