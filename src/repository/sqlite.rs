use async_trait::async_trait;
use sqlx::FromRow;

use crate::db::Database;
use crate::error::StoreError;
use crate::models::{FileListing, FileRecord, FileRow, NewFileRecord};
use crate::repository::FileRepository;

/// `FileRepository` backed by the SQLite `files` table
#[derive(Clone)]
pub struct SqliteFileRepository {
    db: Database,
}

impl SqliteFileRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileRepository for SqliteFileRepository {
    async fn create(&self, record: NewFileRecord) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO files (storage_name, display_name, description, size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.storage_name)
        .bind(&record.display_name)
        .bind(&record.description)
        .bind(record.size_bytes)
        .bind(record.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_by_id(&self, id: i64) -> Result<FileRecord, StoreError> {
        let row: FileRow = sqlx::query_as(
            "SELECT id, storage_name, display_name, description, size_bytes, created_at FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        FileRecord::try_from(row).map_err(StoreError::Malformed)
    }

    async fn list_all(&self) -> Result<FileListing, StoreError> {
        let rows = sqlx::query(
            "SELECT id, storage_name, display_name, description, size_bytes, created_at FROM files ORDER BY id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut listing = FileListing::default();
        for row in &rows {
            let decoded = FileRow::from_row(row)
                .map_err(|e| e.to_string())
                .and_then(FileRecord::try_from);

            match decoded {
                Ok(record) => listing.files.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable file record: {}", e);
                    listing.skipped += 1;
                }
            }
        }

        if listing.skipped > 0 {
            tracing::warn!(
                "Listed {} file records, skipped {} malformed",
                listing.files.len(),
                listing.skipped
            );
        }

        Ok(listing)
    }
}
