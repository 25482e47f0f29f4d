use common::Category;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenge")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,

    pub title: String,
    pub category: Category,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown
    pub points: i32,
    /// Argon2 PHC string of the accepting flag. Never serialized to clients.
    #[serde(skip_serializing)]
    pub flag_hash: String,

    /// Must lie inside the parent event's window.
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
