use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BlobStore, BoxReader};

/// Attachment store on local disk.
///
/// Layout: `{root}/{2 hex chars}/{62 hex chars}`, with in-flight uploads written under
/// `{root}/.incoming` and renamed into place once hashed.
pub struct FilesystemBlobStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join(".incoming")).await?;
        Ok(Self { root, max_size })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let (shard, name) = hash.relative_path();
        self.root.join(shard).join(name)
    }

    fn incoming_path(&self) -> PathBuf {
        self.root
            .join(".incoming")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_incoming(
        &self,
        reader: &mut BoxReader,
        path: &Path,
    ) -> Result<(ContentHash, u64), StorageError> {
        let mut file = fs::File::create(path).await?;
        let mut digest = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > self.max_size {
                return Err(StorageError::SizeLimitExceeded {
                    actual: total,
                    limit: self.max_size,
                });
            }
            digest.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;

        Ok((ContentHash::from_digest(digest), total))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, mut reader: BoxReader) -> Result<(ContentHash, u64), StorageError> {
        let incoming = self.incoming_path();
        let (hash, size) = match self.write_incoming(&mut reader, &incoming).await {
            Ok(v) => v,
            Err(e) => {
                let _ = fs::remove_file(&incoming).await;
                return Err(e);
            }
        };

        let target = self.blob_path(&hash);
        if fs::try_exists(&target).await? {
            debug!(hash = %hash, "Blob already stored, discarding duplicate upload");
            let _ = fs::remove_file(&incoming).await;
            return Ok((hash, size));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Err(e) = fs::rename(&incoming, &target).await {
            let _ = fs::remove_file(&incoming).await;
            return Err(e.into());
        }

        Ok((hash, size))
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(hash)).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
