use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// Reference to a stored blob that callers can open and stream from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    path: PathBuf,
}

impl BlobHandle {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the blob for reading
    pub async fn open(&self) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }
}

/// Storage provider trait
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Copy `reader` into the blob `name` until it is exhausted.
    ///
    /// Fails unless exactly `expected_len` bytes were read. On failure nothing
    /// is left under `name`.
    async fn put(
        &self,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected_len: u64,
    ) -> io::Result<u64>;

    /// Delete a blob; deleting a blob that does not exist succeeds
    async fn delete(&self, name: &str) -> io::Result<()>;

    /// Resolve a blob, or `None` if it is not present
    async fn locate(&self, name: &str) -> io::Result<Option<BlobHandle>>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
