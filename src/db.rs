use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::error::{Result, StoreError};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &str) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(StoreError::from)?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        // Original filenames are deliberately not unique; only the surrogate key is.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                storage_name TEXT NOT NULL,
                display_name TEXT NOT NULL,
                description TEXT,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_created_at ON files(created_at)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}
