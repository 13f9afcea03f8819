pub mod sqlite;

pub use sqlite::*;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{FileListing, FileRecord, NewFileRecord};

/// Durable storage for file metadata
///
/// Implementations know nothing about blob bytes. Every call goes straight to
/// the backing store; nothing is cached.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a record and return the id the store assigned to it
    async fn create(&self, record: NewFileRecord) -> Result<i64, StoreError>;

    /// Fetch a single record
    async fn get_by_id(&self, id: i64) -> Result<FileRecord, StoreError>;

    /// Fetch every record. Rows that cannot be decoded are skipped and
    /// counted instead of failing the whole listing.
    async fn list_all(&self) -> Result<FileListing, StoreError>;
}
