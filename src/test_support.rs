//! Fixtures shared by unit tests.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncRead;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::db::Database;
use crate::error::StoreError;
use crate::models::{FileListing, FileRecord, NewFileRecord};
use crate::repository::{FileRepository, SqliteFileRepository};
use crate::services::{FileService, NamingScheme};
use crate::storage::{BlobHandle, LocalStorage, StorageProvider};

/// Open a migrated SQLite database inside a fresh temp directory
pub async fn test_database() -> (TempDir, Database) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("filedepot.db");
    let db = Database::new(path.to_str().expect("temp path is not UTF-8"))
        .await
        .expect("Failed to open database");
    db.run_migrations().await.expect("Failed to run migrations");
    (temp, db)
}

/// File names in `dir`, sorted; empty when the directory does not exist
pub fn blob_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Repository whose writes always fail as if the database were down
pub struct FailingRepository;

#[async_trait]
impl FileRepository for FailingRepository {
    async fn create(&self, _record: NewFileRecord) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolClosed))
    }

    async fn get_by_id(&self, _id: i64) -> Result<FileRecord, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn list_all(&self) -> Result<FileListing, StoreError> {
        Ok(FileListing::default())
    }
}

/// Local storage that refuses to delete anything
pub struct UndeletableStorage(pub LocalStorage);

#[async_trait]
impl StorageProvider for UndeletableStorage {
    async fn put(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected_len: u64,
    ) -> io::Result<u64> {
        self.0.put(name, reader, expected_len).await
    }

    async fn delete(&self, _name: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "blob root is read-only",
        ))
    }

    async fn locate(&self, name: &str) -> io::Result<Option<BlobHandle>> {
        self.0.locate(name).await
    }

    fn storage_type(&self) -> &'static str {
        self.0.storage_type()
    }
}

pub struct TestEnv {
    _temp: TempDir,
    pub db: Database,
    pub service: Arc<FileService>,
    /// Blob root; not created until the first upload
    pub upload_dir: PathBuf,
}

impl TestEnv {
    pub async fn new(naming: NamingScheme) -> Self {
        Self::with_limit(naming, DEFAULT_MAX_UPLOAD_BYTES).await
    }

    pub async fn with_limit(naming: NamingScheme, max_upload_bytes: u64) -> Self {
        let (temp, db) = test_database().await;
        let repo = Arc::new(SqliteFileRepository::new(db.clone()));
        let storage = Arc::new(LocalStorage::new(temp.path().join("uploads")));
        Self::build(temp, db, repo, storage, naming, max_upload_bytes)
    }

    pub async fn with_failing_store(naming: NamingScheme) -> Self {
        let (temp, db) = test_database().await;
        let upload_dir = temp.path().join("uploads");
        let storage = Arc::new(LocalStorage::new(upload_dir.clone()));
        Self::build(temp, db, Arc::new(FailingRepository), storage, naming, DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Failing metadata store over blobs that cannot be removed again
    pub async fn with_failing_store_and_cleanup(naming: NamingScheme) -> Self {
        let (temp, db) = test_database().await;
        let upload_dir = temp.path().join("uploads");
        let storage = Arc::new(UndeletableStorage(LocalStorage::new(upload_dir.clone())));
        Self::build(temp, db, Arc::new(FailingRepository), storage, naming, DEFAULT_MAX_UPLOAD_BYTES)
    }

    fn build(
        temp: TempDir,
        db: Database,
        repo: Arc<dyn FileRepository>,
        storage: Arc<dyn StorageProvider>,
        naming: NamingScheme,
        max_upload_bytes: u64,
    ) -> Self {
        let upload_dir = temp.path().join("uploads");
        let service = Arc::new(FileService::new(repo, storage, naming, max_upload_bytes));

        Self {
            _temp: temp,
            db,
            service,
            upload_dir,
        }
    }
}
