use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::storage::{BlobHandle, StorageProvider};

/// Local file system storage provider
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn get_full_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    // Fixed length, independent of the blob name.
    fn staging_path(&self) -> PathBuf {
        self.base_path
            .join(format!(".{}.partial", Uuid::new_v4().simple()))
    }

    async fn write_staged(
        &self,
        staging: &Path,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected_len: u64,
    ) -> io::Result<u64> {
        let mut file = fs::File::create(staging).await?;

        // Read one byte past the expected length so overlong streams are caught.
        let mut limited = reader.take(expected_len.saturating_add(1));
        let written = tokio::io::copy(&mut limited, &mut file).await?;
        if written != expected_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "stream length mismatch: expected {} bytes, got {}{}",
                    expected_len,
                    written,
                    if written > expected_len { " or more" } else { "" }
                ),
            ));
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected_len: u64,
    ) -> io::Result<u64> {
        fs::create_dir_all(&self.base_path).await?;

        let staging = self.staging_path();
        let result = match self.write_staged(&staging, reader, expected_len).await {
            Ok(written) => fs::rename(&staging, self.get_full_path(name))
                .await
                .map(|_| written),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = fs::remove_file(&staging).await {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staging file {:?}: {}", staging, e);
                }
            }
        } else {
            tracing::debug!("Saved {} bytes to {:?}", expected_len, self.get_full_path(name));
        }

        result
    }

    async fn delete(&self, name: &str) -> io::Result<()> {
        let full_path = self.get_full_path(name);

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", full_path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn locate(&self, name: &str) -> io::Result<Option<BlobHandle>> {
        let full_path = self.get_full_path(name);

        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => Ok(Some(BlobHandle::new(full_path))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
