use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership row. The composite key makes the member list a set; `event_id` is
/// denormalized so `(event_id, user_id)` can be unique (one team per user per event).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub team_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,

    pub event_id: i32,

    pub joined_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
