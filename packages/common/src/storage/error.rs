/// Errors raised by the attachment blob store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No blob is stored under the requested hash.
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The provided content hash is not 64 hex characters.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}
