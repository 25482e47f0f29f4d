use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::{debug, info};

use super::{membership, window};
use crate::entity::{challenge, event, practice_solve, solve};
use crate::error::AppError;
use crate::utils::hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new ledger entry was written for the team.
    Solved { points: i32 },
    /// The team already holds credit for this challenge. Nothing was written.
    AlreadySolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeOutcome {
    Correct,
    AlreadySolved,
    Incorrect,
}

/// Trimmed flag, or a validation error when nothing is left.
pub fn normalize_flag(raw: &str) -> Result<&str, AppError> {
    let flag = raw.trim();
    if flag.is_empty() {
        return Err(AppError::Validation("Flag is required".into()));
    }
    Ok(flag)
}

fn flag_matches(flag: &str, challenge: &challenge::Model) -> Result<bool, AppError> {
    hash::verify_secret(flag, &challenge.flag_hash)
        .map_err(|e| AppError::Internal(format!("Flag verify error: {}", e)))
}

/// Competitive submission. Checks run in a fixed order and the first failure wins:
/// flag present, event running, caller on a team, challenge in the event, challenge
/// open, not yet solved by the team, flag correct.
pub async fn submit_flag(
    db: &DatabaseConnection,
    user_id: i32,
    challenge_id: i32,
    raw_flag: &str,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, AppError> {
    let flag = normalize_flag(raw_flag)?;

    let event = window::active_event(db, now)
        .await?
        .ok_or_else(|| AppError::Conflict("No active event right now".into()))?;

    let team = membership::find_team_for_user(db, user_id, event.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Create or join a team first".into()))?;

    let challenge = challenge::Entity::find_by_id(challenge_id)
        .filter(challenge::Column::EventId.eq(event.id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;

    if !window::is_challenge_open(&challenge, &event, now) {
        return Err(AppError::Forbidden("Challenge is not active".into()));
    }

    let existing = solve::Entity::find()
        .filter(solve::Column::TeamId.eq(team.id))
        .filter(solve::Column::ChallengeId.eq(challenge.id))
        .filter(solve::Column::EventId.eq(event.id))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(SubmitOutcome::AlreadySolved);
    }

    if !flag_matches(flag, &challenge)? {
        debug!(challenge_id, team_id = team.id, "Incorrect flag");
        return Err(AppError::IncorrectFlag);
    }

    record_solve(db, user_id, team.id, &challenge, &event, now).await
}

/// Insert the ledger entry. The unique `(team, challenge, event)` index is the
/// arbiter: losing a race to a teammate is reported as already solved.
pub async fn record_solve<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    team_id: i32,
    challenge: &challenge::Model,
    event: &event::Model,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, AppError> {
    let insert = solve::ActiveModel {
        user_id: Set(user_id),
        team_id: Set(team_id),
        challenge_id: Set(challenge.id),
        event_id: Set(event.id),
        points: Set(challenge.points),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await;

    match insert {
        Ok(_) => {
            info!(
                challenge_id = challenge.id,
                team_id,
                user_id,
                points = challenge.points,
                "Solve recorded"
            );
            Ok(SubmitOutcome::Solved {
                points: challenge.points,
            })
        }
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                debug!(
                    challenge_id = challenge.id,
                    team_id, "Concurrent solve caught by unique index"
                );
                Ok(SubmitOutcome::AlreadySolved)
            }
            _ => Err(AppError::from(e)),
        },
    }
}

/// Practice submission on a challenge whose event has ended. Awards no points.
pub async fn submit_practice(
    db: &DatabaseConnection,
    user_id: i32,
    challenge_id: i32,
    raw_flag: &str,
    now: DateTime<Utc>,
) -> Result<PracticeOutcome, AppError> {
    let flag = normalize_flag(raw_flag)?;

    let challenge = challenge::Entity::find_by_id(challenge_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;

    let event = event::Entity::find_by_id(challenge.event_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;

    if !window::has_ended(&event, now) {
        return Err(AppError::Forbidden(
            "Practice opens after the event ends".into(),
        ));
    }

    let existing = practice_solve::Entity::find()
        .filter(practice_solve::Column::UserId.eq(user_id))
        .filter(practice_solve::Column::ChallengeId.eq(challenge.id))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(PracticeOutcome::AlreadySolved);
    }

    if !flag_matches(flag, &challenge)? {
        return Ok(PracticeOutcome::Incorrect);
    }

    record_practice_solve(db, user_id, challenge.id, now).await
}

pub async fn record_practice_solve<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    challenge_id: i32,
    now: DateTime<Utc>,
) -> Result<PracticeOutcome, AppError> {
    let insert = practice_solve::ActiveModel {
        user_id: Set(user_id),
        challenge_id: Set(challenge_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await;

    match insert {
        Ok(_) => {
            info!(challenge_id, user_id, "Practice solve recorded");
            Ok(PracticeOutcome::Correct)
        }
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Ok(PracticeOutcome::AlreadySolved),
            _ => Err(AppError::from(e)),
        },
    }
}
