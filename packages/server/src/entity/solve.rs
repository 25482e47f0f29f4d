use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Competitive ledger entry: one credit per `(team_id, challenge_id, event_id)`.
///
/// Rows are never updated. They are only removed when their event is deleted.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "solve")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Member who submitted the flag.
    pub user_id: i32,
    /// Team credited for the solve.
    pub team_id: i32,
    pub challenge_id: i32,
    pub event_id: i32,

    /// Snapshot of the challenge's points when the solve was recorded.
    pub points: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
