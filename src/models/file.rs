use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Stored file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    /// Name of the blob on disk, generated at upload time
    pub storage_name: String,
    /// Name the uploader gave the file
    pub display_name: String,
    pub description: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// File metadata before the store has assigned an id
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub storage_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl NewFileRecord {
    pub fn with_id(self, id: i64) -> FileRecord {
        FileRecord {
            id,
            storage_name: self.storage_name,
            display_name: self.display_name,
            description: self.description,
            size_bytes: self.size_bytes,
            created_at: self.created_at,
        }
    }
}

/// Raw `files` row as persisted
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub id: i64,
    pub storage_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub size_bytes: i64,
    pub created_at: String,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = String;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        if row.size_bytes < 0 {
            return Err(format!("row {} has negative size {}", row.id, row.size_bytes));
        }
        if row.storage_name.is_empty() {
            return Err(format!("row {} has an empty storage name", row.id));
        }
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| format!("row {} has invalid created_at {:?}: {}", row.id, row.created_at, e))?
            .with_timezone(&Utc);

        Ok(Self {
            id: row.id,
            storage_name: row.storage_name,
            display_name: row.display_name,
            description: row.description,
            size_bytes: row.size_bytes,
            created_at,
        })
    }
}

/// Result of listing every record
#[derive(Debug, Clone, Default)]
pub struct FileListing {
    pub files: Vec<FileRecord>,
    /// Rows that could not be decoded and were left out
    pub skipped: usize,
}

/// File as presented to API clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: i64,
    pub file_name: String,
    pub size_bytes: i64,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
    pub uploaded_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            file_name: file.display_name,
            size_bytes: file.size_bytes,
            size_mb: file.size_bytes as f64 / 1024.0 / 1024.0,
            uploaded_at: file.created_at,
            description: file.description,
        }
    }
}

/// File list response
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub skipped: usize,
}

impl From<FileListing> for FileListResponse {
    fn from(listing: FileListing) -> Self {
        Self {
            files: listing.files.into_iter().map(FileResponse::from).collect(),
            skipped: listing.skipped,
        }
    }
}
