use std::fmt;

use sha2::{Digest, Sha256};

use super::error::StorageError;

/// SHA-256 digest addressing one stored attachment body.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn from_digest(digest: Sha256) -> Self {
        Self(digest.finalize().into())
    }

    /// Parse the 64-character hex form stored on `challenge_file` rows.
    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        let bytes = hex::decode(s).map_err(|e| StorageError::InvalidHash(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            StorageError::InvalidHash(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Two-level directory layout: first byte as the shard directory.
    pub fn relative_path(&self) -> (String, String) {
        (hex::encode(&self.0[..1]), hex::encode(&self.0[1..]))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
