use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::challenge_file;

/// Metadata of one challenge attachment.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AttachmentResponse {
    /// Attachment ID (UUIDv7). Download via `GET /files/{id}`.
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "chall.zip")]
    pub filename: String,
    #[schema(example = "application/zip")]
    pub content_type: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub size: i64,
    /// SHA-256 content hash.
    #[schema(example = "a1b2c3d4e5f6...")]
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<challenge_file::Model> for AttachmentResponse {
    fn from(model: challenge_file::Model) -> Self {
        Self {
            id: model.id.to_string(),
            filename: model.filename,
            content_type: model.content_type,
            size: model.size,
            content_hash: model.content_hash,
            created_at: model.created_at,
        }
    }
}
