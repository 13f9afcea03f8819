use chrono::Utc;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::error::{AppError, Result};
use crate::models::{FileListing, FileRecord, NewFileRecord};
use crate::repository::FileRepository;
use crate::services::naming::{validate_file_name, validate_storage_name, NamingScheme};
use crate::storage::{BlobHandle, StorageProvider};

/// A file record together with the location of its bytes
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub record: FileRecord,
    pub blob: BlobHandle,
}

/// File service
///
/// Coordinates blob storage and the metadata store. Bytes are written first and
/// metadata second; if the metadata write fails the blob is removed again, so
/// a record is never visible without its bytes. An orphaned blob is the worst
/// case a crash can leave behind.
pub struct FileService {
    repo: Arc<dyn FileRepository>,
    storage: Arc<dyn StorageProvider>,
    naming: NamingScheme,
    max_upload_bytes: u64,
}

impl FileService {
    pub fn new(
        repo: Arc<dyn FileRepository>,
        storage: Arc<dyn StorageProvider>,
        naming: NamingScheme,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            repo,
            storage,
            naming,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Store an uploaded file and record its metadata
    pub async fn create_file<R>(
        &self,
        mut reader: R,
        declared_size: u64,
        original_name: &str,
        description: Option<String>,
    ) -> Result<FileRecord>
    where
        R: AsyncRead + Send + Unpin,
    {
        if declared_size > self.max_upload_bytes {
            tracing::warn!(
                "Rejected upload {:?}: {} bytes exceeds limit of {}",
                original_name,
                declared_size,
                self.max_upload_bytes
            );
            return Err(AppError::PayloadTooLarge {
                limit: self.max_upload_bytes,
            });
        }
        validate_file_name(original_name)?;
        let size_bytes = i64::try_from(declared_size)
            .map_err(|_| AppError::PayloadTooLarge { limit: self.max_upload_bytes })?;

        let now = Utc::now();
        let storage_name = self.naming.storage_name(original_name, now);
        validate_storage_name(original_name, &storage_name)?;

        self.storage
            .put(&storage_name, &mut reader, declared_size)
            .await
            .map_err(AppError::DiskWriteFailed)?;

        let new_record = NewFileRecord {
            storage_name: storage_name.clone(),
            display_name: original_name.to_string(),
            description,
            size_bytes,
            created_at: now,
        };

        let id = match self.repo.create(new_record.clone()).await {
            Ok(id) => id,
            Err(e) => {
                self.discard_blob(&storage_name).await;
                return Err(AppError::MetadataWriteFailed(e));
            }
        };

        tracing::info!(
            "Stored file {} as {} ({} bytes, {})",
            id,
            storage_name,
            size_bytes,
            self.storage.storage_type()
        );

        Ok(new_record.with_id(id))
    }

    /// Look up a file and the blob holding its bytes
    pub async fn get_file(&self, id: i64) -> Result<StoredFile> {
        let record = self.repo.get_by_id(id).await?;

        match self.storage.locate(&record.storage_name).await? {
            Some(blob) => Ok(StoredFile { record, blob }),
            None => Err(AppError::BlobMissing {
                id: record.id,
                storage_name: record.storage_name,
            }),
        }
    }

    /// List every readable file record. Blob presence is not checked.
    pub async fn list_files(&self) -> Result<FileListing> {
        Ok(self.repo.list_all().await?)
    }

    // Errors here are logged only so they never hide the metadata failure.
    async fn discard_blob(&self, storage_name: &str) {
        match self.storage.delete(storage_name).await {
            Ok(()) => tracing::warn!(
                "Removed blob {} after metadata write failed",
                storage_name
            ),
            Err(e) => tracing::error!(
                "Failed to remove orphaned blob {}: {}",
                storage_name,
                e
            ),
        }
    }
}
