//! One-shot SQL migration runner.

use std::path::Path;

use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::store::MovieStore;

/// Default migration script, relative to the working directory.
pub const DEFAULT_MIGRATION_FILE: &str = "crates/moviedb-store/migrations/0000_create_movies.sql";

/// Read a migration script, rejecting empty files.
pub fn read_migration(path: &Path) -> StoreResult<String> {
    let sql = std::fs::read_to_string(path)?;
    if sql.trim().is_empty() {
        return Err(StoreError::Migration(format!(
            "migration file {} is empty",
            path.display()
        )));
    }
    Ok(sql)
}

/// Execute the migration script at `path` as a single multi-statement batch.
pub async fn run_migration(store: &MovieStore, path: &Path) -> StoreResult<()> {
    let sql = read_migration(path)?;
    let pool = store.pool().await?;

    info!(file = %path.display(), "Running migrations...");
    sqlx::raw_sql(&sql).execute(pool).await?;
    info!("Migrations complete");

    Ok(())
}
