use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::{debug, info};

use crate::entity::{team, team_member};
use crate::error::AppError;
use crate::utils::{hash, token};

const ALREADY_IN_TEAM: &str = "You already have a team for this event";
const NAME_TAKEN: &str = "Team name already taken";
const INVITE_TOKEN_ATTEMPTS: usize = 5;

/// The team `user_id` belongs to in `event_id`, if any.
pub async fn find_team_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    event_id: i32,
) -> Result<Option<team::Model>, DbErr> {
    let Some(member) = team_member::Entity::find()
        .filter(team_member::Column::EventId.eq(event_id))
        .filter(team_member::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    team::Entity::find_by_id(member.team_id).one(db).await
}

pub async fn member_count<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<u64, DbErr> {
    team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .count(db)
        .await
}

/// Member count per team of `event_id`. Teams without members are absent.
pub async fn member_counts<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
) -> Result<HashMap<i32, u64>, DbErr> {
    let mut counts: HashMap<i32, u64> = HashMap::new();
    for m in team_member::Entity::find()
        .filter(team_member::Column::EventId.eq(event_id))
        .all(db)
        .await?
    {
        *counts.entry(m.team_id).or_default() += 1;
    }
    Ok(counts)
}

/// An invite token not used by any team.
pub async fn unused_invite_token<C: ConnectionTrait>(db: &C) -> Result<String, AppError> {
    for _ in 0..INVITE_TOKEN_ATTEMPTS {
        let candidate = token::invite_token();
        let taken = team::Entity::find()
            .filter(team::Column::InviteToken.eq(&candidate))
            .count(db)
            .await?
            > 0;
        if !taken {
            return Ok(candidate);
        }
        debug!("Invite token collision, retrying");
    }
    Err(AppError::Internal(
        "Could not generate a unique invite token".into(),
    ))
}

/// Create a team in `event_id` with the caller as leader and sole member.
pub async fn create_team(
    db: &DatabaseConnection,
    user_id: i32,
    event_id: i32,
    name: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<team::Model, AppError> {
    create_team_with_tokens(db, user_id, event_id, name, password, now, token::invite_token).await
}

async fn team_name_taken<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
    name: &str,
) -> Result<bool, DbErr> {
    Ok(team::Entity::find()
        .filter(team::Column::EventId.eq(event_id))
        .filter(team::Column::Name.eq(name))
        .count(db)
        .await?
        > 0)
}

/// [`create_team`] drawing invite tokens from `next_token`.
///
/// A unique violation on the team row is a name conflict only when the name is now taken
/// in the event. Otherwise the invite token collided and a fresh one is drawn.
pub async fn create_team_with_tokens<F>(
    db: &DatabaseConnection,
    user_id: i32,
    event_id: i32,
    name: &str,
    password: &str,
    now: DateTime<Utc>,
    mut next_token: F,
) -> Result<team::Model, AppError>
where
    F: FnMut() -> String,
{
    if find_team_for_user(db, user_id, event_id).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_IN_TEAM.into()));
    }
    if team_name_taken(db, event_id, name).await? {
        return Err(AppError::Conflict(NAME_TAKEN.into()));
    }

    let password_hash = hash::hash_secret(password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    for _ in 0..INVITE_TOKEN_ATTEMPTS {
        let txn = db.begin().await?;

        let inserted = team::ActiveModel {
            event_id: Set(event_id),
            name: Set(name.to_string()),
            leader_id: Set(user_id),
            invite_token: Set(next_token()),
            password_hash: Set(password_hash.clone()),
            banned: Set(false),
            ban_reason: Set(String::new()),
            banned_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let created = match inserted {
            Ok(created) => created,
            Err(e) => {
                if !matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return Err(AppError::from(e));
                }
                txn.rollback().await?;
                if team_name_taken(db, event_id, name).await? {
                    return Err(AppError::Conflict(NAME_TAKEN.into()));
                }
                debug!("Invite token collision, retrying");
                continue;
            }
        };

        team_member::ActiveModel {
            team_id: Set(created.id),
            user_id: Set(user_id),
            event_id: Set(event_id),
            joined_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict(ALREADY_IN_TEAM.into())
            }
            _ => AppError::from(e),
        })?;

        txn.commit().await?;

        info!(team_id = created.id, event_id, user_id, "Team created");
        return Ok(created);
    }

    Err(AppError::Internal(
        "Could not generate a unique invite token".into(),
    ))
}

/// Add `user_id` to the team holding `invite_token` in `event_id`.
///
/// Re-joining the team the user already belongs to is a no-op. Joining any other team
/// while holding a membership in the event is a conflict.
pub async fn join_team(
    db: &DatabaseConnection,
    user_id: i32,
    event_id: i32,
    invite_token: &str,
    now: DateTime<Utc>,
) -> Result<team::Model, AppError> {
    let invite_token = token::normalize_invite_token(invite_token);

    let target = team::Entity::find()
        .filter(team::Column::EventId.eq(event_id))
        .filter(team::Column::InviteToken.eq(&invite_token))
        .one(db)
        .await?;

    if let Some(current) = find_team_for_user(db, user_id, event_id).await? {
        return match target {
            Some(target) if target.id == current.id => Ok(current),
            _ => Err(AppError::Conflict(ALREADY_IN_TEAM.into())),
        };
    }

    let target = target.ok_or_else(|| AppError::NotFound("Invalid invite token".into()))?;
    if target.banned {
        return Err(AppError::Forbidden("Team is banned".into()));
    }

    let result = team_member::Entity::insert(team_member::ActiveModel {
        team_id: Set(target.id),
        user_id: Set(user_id),
        event_id: Set(event_id),
        joined_at: Set(now),
    })
    .on_conflict(
        sea_orm::sea_query::OnConflict::columns([
            team_member::Column::TeamId,
            team_member::Column::UserId,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => {
            return Err(match e.sql_err() {
                // Lost a race against a concurrent join into another team.
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict(ALREADY_IN_TEAM.into())
                }
                _ => AppError::from(e),
            });
        }
    }

    info!(team_id = target.id, event_id, user_id, "User joined team");
    Ok(target)
}
