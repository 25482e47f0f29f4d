use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `(event_id, name)` is unique, see `seed::ensure_indexes`.
    pub event_id: i32,
    pub name: String,

    pub leader_id: i32,

    #[sea_orm(unique)]
    pub invite_token: String,
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub banned: bool,
    pub ban_reason: String,
    pub banned_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
