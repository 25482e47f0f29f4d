use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A time-boxed competition owning its challenges and teams.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    /// Window is inclusive on both ends; `ends_at > starts_at` always holds.
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
