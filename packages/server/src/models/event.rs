use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{validate_length, validate_window};
use crate::error::AppError;
use crate::scoring::window::{EventContext, EventMode};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    /// Event name (2-80 characters).
    #[schema(example = "Spring CTF 2026")]
    pub name: String,
    pub starts_at: DateTime<Utc>,
    /// Must be strictly after `starts_at`.
    pub ends_at: DateTime<Utc>,
}

pub fn validate_create_event(payload: &CreateEventRequest) -> Result<(), AppError> {
    validate_length("Event name", &payload.name, 2, 80)?;
    validate_window(payload.starts_at, payload.ends_at)
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Field-level checks. The merged window is checked by the handler.
pub fn validate_update_event(payload: &UpdateEventRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_length("Event name", name, 2, 80)?;
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Spring CTF 2026")]
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::event::Model> for EventResponse {
    fn from(m: crate::entity::event::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Outcome of a post-event team cleanup.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CleanupResponse {
    pub ok: bool,
    /// Teams removed because they held no solve.
    #[schema(example = 3)]
    pub deleted_teams: u64,
}

/// The active event, else the next upcoming one.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EventContextResponse {
    pub mode: EventMode,
    pub event: Option<EventResponse>,
}

impl From<EventContext> for EventContextResponse {
    fn from(ctx: EventContext) -> Self {
        Self {
            mode: ctx.mode,
            event: ctx.event.map(EventResponse::from),
        }
    }
}
