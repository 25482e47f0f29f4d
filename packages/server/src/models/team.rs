use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::EventResponse;
use super::shared::validate_length;
use crate::error::AppError;
use crate::scoring::window::EventMode;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    /// Team name (2-40 characters, unique within the event).
    #[schema(example = "0xDEADBEEF")]
    pub name: String,
    /// Team password (4-72 characters).
    #[schema(example = "hunter22")]
    pub password: String,
}

pub fn validate_create_team(payload: &CreateTeamRequest) -> Result<(), AppError> {
    validate_length("Team name", &payload.name, 2, 40)?;
    validate_length("Password", &payload.password, 4, 72)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct JoinTeamRequest {
    /// Invite token. Case and surrounding whitespace are ignored.
    #[schema(example = "A1B2C3D4E5F6")]
    pub invite_token: String,
}

pub fn validate_join_team(payload: &JoinTeamRequest) -> Result<(), AppError> {
    if payload.invite_token.trim().is_empty() {
        return Err(AppError::Validation("Invite token is required".into()));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RenameTeamRequest {
    pub name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BanTeamRequest {
    /// `true` to ban, `false` to lift the ban.
    pub banned: bool,
    /// Shown to administrators only (max 200 characters).
    #[serde(default)]
    pub reason: String,
}

pub fn validate_ban_team(payload: &BanTeamRequest) -> Result<(), AppError> {
    if payload.reason.trim().chars().count() > 200 {
        return Err(AppError::Validation(
            "Ban reason must be at most 200 characters".into(),
        ));
    }
    Ok(())
}

/// Team as seen by its members.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    #[schema(example = 7)]
    pub id: i32,
    pub event_id: i32,
    #[schema(example = "0xDEADBEEF")]
    pub name: String,
    pub leader_id: i32,
    #[schema(example = "A1B2C3D4E5F6")]
    pub invite_token: String,
    pub members: u64,
}

impl TeamResponse {
    pub fn new(m: crate::entity::team::Model, members: u64) -> Self {
        Self {
            id: m.id,
            event_id: m.event_id,
            name: m.name,
            leader_id: m.leader_id,
            invite_token: m.invite_token,
            members,
        }
    }
}

/// Team as seen by administrators.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminTeamResponse {
    pub id: i32,
    pub event_id: i32,
    pub name: String,
    pub leader_id: i32,
    pub invite_token: String,
    pub members: u64,
    pub banned: bool,
    pub ban_reason: String,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AdminTeamResponse {
    pub fn new(m: crate::entity::team::Model, members: u64) -> Self {
        Self {
            id: m.id,
            event_id: m.event_id,
            name: m.name,
            leader_id: m.leader_id,
            invite_token: m.invite_token,
            members,
            banned: m.banned,
            ban_reason: m.ban_reason,
            banned_at: m.banned_at,
            created_at: m.created_at,
        }
    }
}

/// Team as listed publicly. No invite token.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PublicTeamResponse {
    pub id: i32,
    #[schema(example = "0xDEADBEEF")]
    pub name: String,
    pub leader_id: i32,
    pub members: u64,
}

impl PublicTeamResponse {
    pub fn new(m: crate::entity::team::Model, members: u64) -> Self {
        Self {
            id: m.id,
            name: m.name,
            leader_id: m.leader_id,
            members,
        }
    }
}

/// Teams of the running event. Empty with no event outside any event window.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamListResponse {
    pub event: Option<EventResponse>,
    pub teams: Vec<PublicTeamResponse>,
}

/// Result of create or join.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamMembershipResponse {
    pub ok: bool,
    pub mode: EventMode,
    pub event_id: i32,
    pub team: TeamResponse,
}

/// The caller's team in the current event context.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MyTeamResponse {
    pub has_team: bool,
    pub mode: EventMode,
    pub event_id: Option<i32>,
    pub team: Option<TeamResponse>,
}
