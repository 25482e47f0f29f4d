use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attachment metadata; the bytes live in the blob store under `content_hash`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenge_file")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub challenge_id: i32,

    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
