use chrono::{DateTime, Utc};
use common::Category;
use serde::{Deserialize, Serialize};

use super::attachment::AttachmentResponse;
use super::event::EventResponse;
use super::shared::{Pagination, validate_length, validate_window};
use crate::error::AppError;
use crate::scoring::window::EventMode;

pub const MIN_POINTS: i32 = 1;
pub const MAX_POINTS: i32 = 10_000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateChallengeRequest {
    /// Owning event. Defaults to the most recently created event.
    pub event_id: Option<i32>,
    /// Title (2-80 characters).
    #[schema(example = "Baby RSA")]
    pub title: String,
    pub category: Category,
    /// Markdown description.
    #[serde(default)]
    pub description: String,
    /// Points awarded on solve (1-10000).
    #[schema(example = 100)]
    pub points: i32,
    /// Accepting flag (4-200 characters). Stored hashed only.
    #[schema(example = "flag{sm4ll_e}")]
    pub flag: String,
    /// Must lie inside the event window.
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

fn validate_points(points: i32) -> Result<(), AppError> {
    if !(MIN_POINTS..=MAX_POINTS).contains(&points) {
        return Err(AppError::Validation(format!(
            "Points must be {MIN_POINTS}-{MAX_POINTS}"
        )));
    }
    Ok(())
}

pub fn validate_create_challenge(payload: &CreateChallengeRequest) -> Result<(), AppError> {
    validate_length("Title", &payload.title, 2, 80)?;
    validate_points(payload.points)?;
    validate_length("Flag", &payload.flag, 4, 200)?;
    validate_window(payload.starts_at, payload.ends_at)
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateChallengeRequest {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub points: Option<i32>,
    /// New flag. Omit to keep the current one.
    pub flag: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Field-level checks. The merged window is checked by the handler.
pub fn validate_update_challenge(payload: &UpdateChallengeRequest) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        validate_length("Title", title, 2, 80)?;
    }
    if let Some(points) = payload.points {
        validate_points(points)?;
    }
    if let Some(ref flag) = payload.flag
        && !flag.trim().is_empty()
    {
        validate_length("Flag", flag, 4, 200)?;
    }
    Ok(())
}

/// Full challenge as seen by administrators. Never includes the flag.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminChallengeResponse {
    pub id: i32,
    pub event_id: i32,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub points: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub files: Vec<AttachmentResponse>,
    /// Number of teams credited with this challenge.
    pub solves: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminChallengeResponse {
    pub fn new(
        m: crate::entity::challenge::Model,
        files: Vec<AttachmentResponse>,
        solves: u64,
    ) -> Self {
        Self {
            id: m.id,
            event_id: m.event_id,
            title: m.title,
            category: m.category,
            description: m.description,
            points: m.points,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            files,
            solves,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminChallengeListQuery {
    /// Restrict to one event.
    pub event_id: Option<i32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminChallengeListResponse {
    pub data: Vec<AdminChallengeResponse>,
    pub pagination: Pagination,
}

/// A challenge on the player board.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeResponse {
    pub id: i32,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub points: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Whether the caller's team already holds credit for it.
    pub solved: bool,
    pub files: Vec<AttachmentResponse>,
}

impl ChallengeResponse {
    pub fn new(
        m: crate::entity::challenge::Model,
        solved: bool,
        files: Vec<AttachmentResponse>,
    ) -> Self {
        Self {
            id: m.id,
            title: m.title,
            category: m.category,
            description: m.description,
            points: m.points,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            solved,
            files,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeBoardResponse {
    pub mode: EventMode,
    pub event: Option<EventResponse>,
    /// Caller's team in the event, once an event exists.
    pub team_name: Option<String>,
    pub challenges: Vec<ChallengeResponse>,
}

/// A challenge from a finished event, open for practice.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PracticeChallengeResponse {
    pub id: i32,
    pub event_id: i32,
    #[schema(example = "Spring CTF 2026")]
    pub event_name: String,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub points: i32,
    /// Whether the caller has a practice solve for it.
    pub solved: bool,
    pub files: Vec<AttachmentResponse>,
}
