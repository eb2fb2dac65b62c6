// SQLite pool bootstrap shared by every store.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Open (creating if needed) the database file at `database_path`.
pub async fn connect(database_path: &str) -> anyhow::Result<SqlitePool> {
    // Keep runtime databases in their own folder so the repo root stays tidy.
    if let Some(parent) = Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}?mode=rwc", database_path))
        .await?;

    tracing::info!(path = database_path, "Connected to SQLite database");
    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn temp_pool(dir: &tempfile::TempDir) -> SqlitePool {
    let path = dir.path().join("bot.db");
    connect(path.to_str().unwrap()).await.unwrap()
}
