pub mod attachment;
pub mod auth;
pub mod challenge;
pub mod event;
pub mod leaderboard;
pub mod submission;
pub mod team;
pub mod user;

use sea_orm::*;

use crate::entity::{challenge as challenge_entity, event as event_entity, team as team_entity};
use crate::error::AppError;

pub(crate) async fn find_event<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<event_entity::Model, AppError> {
    event_entity::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

pub(crate) async fn find_challenge<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<challenge_entity::Model, AppError> {
    challenge_entity::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
}

pub(crate) async fn find_team<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<team_entity::Model, AppError> {
    team_entity::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))
}
