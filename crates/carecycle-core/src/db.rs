use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use crate::error::CoreError;

// Re-export the pool for use in other parts of the core crate
pub use sqlx::SqlitePool as DbPool;

/// Opens (creating if needed) the SQLite database at `db_path` and applies
/// the embedded migrations.
///
/// # Arguments
///
/// * `db_path` - The path to the SQLite database file.
///
/// # Returns
///
/// A `Result` containing the `SqlitePool` or a `CoreError` if the connection fails
/// or migrations cannot be run.
pub async fn establish_connection(db_path: &str) -> Result<SqlitePool, CoreError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    if !Path::new(db_path).exists() {
        tokio::fs::File::create(db_path).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_path)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(path = db_path, "database ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directories_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/care/carecycle.db");
        let path = path.to_str().unwrap();

        tokio_test::block_on(async {
            let pool = establish_connection(path).await.unwrap();
            pool.close().await;

            // Migrations already applied; a second open is a no-op.
            let pool = establish_connection(path).await.unwrap();
            let (tables,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('care_items', 'recurrence_rules', 'completion_events')",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(tables, 3);
        });
    }
}
