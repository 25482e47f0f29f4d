use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content-addressed storage for challenge attachments.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the reader's bytes, returning their hash and length.
    async fn put_stream(&self, reader: BoxReader) -> Result<(ContentHash, u64), StorageError>;

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(hash).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Returns `false` when nothing was stored under `hash`.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
