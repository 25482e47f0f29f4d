use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use super::attachment::release_blobs;
use super::find_event;
use crate::entity::{challenge, challenge_file, event, practice_solve, solve, team, team_member};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::event::*;
use crate::models::shared::validate_window;
use crate::models::team::AdminTeamResponse;
use crate::scoring::{membership, window};
use crate::seed::permissions::{EVENT_MANAGE, TEAM_MANAGE};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/current",
    tag = "Events",
    operation_id = "currentEvent",
    summary = "Active or next event",
    description = "Returns the running event (`mode = active`), otherwise the earliest event \
        that has not started (`mode = upcoming`), otherwise `mode = none` with no event.",
    responses(
        (status = 200, description = "Event context", body = EventContextResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn current_event(
    State(state): State<AppState>,
) -> Result<Json<EventContextResponse>, AppError> {
    let ctx = window::resolve_event_context(&state.db, Utc::now()).await?;
    Ok(Json(EventContextResponse::from(ctx)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Events",
    operation_id = "listEvents",
    summary = "List events",
    description = "All events, newest start first. Requires `event:manage`.",
    responses(
        (status = 200, description = "Events", body = Vec<EventResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_events(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;

    let events = event::Entity::find()
        .order_by_desc(event::Column::StartsAt)
        .order_by_desc(event::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Events",
    operation_id = "createEvent",
    summary = "Create an event",
    description = "Creates an event. `ends_at` must be strictly after `starts_at`. \
        Requires `event:manage`.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    validate_create_event(&payload)?;

    let now = Utc::now();
    let model = event::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        starts_at: Set(payload.starts_at),
        ends_at: Set(payload.ends_at),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(event_id = model.id, "Event created");
    Ok((StatusCode::CREATED, Json(EventResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Events",
    operation_id = "getEvent",
    summary = "Get an event",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event", body = EventResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EventResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    Ok(Json(EventResponse::from(find_event(&state.db, id).await?)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Events",
    operation_id = "updateEvent",
    summary = "Update an event",
    description = "Partially updates an event. The resulting window must be non-empty and \
        must still contain the window of every challenge in the event. Requires `event:manage`.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;
    validate_update_event(&payload)?;

    let existing = find_event(&state.db, id).await?;
    let starts_at = payload.starts_at.unwrap_or(existing.starts_at);
    let ends_at = payload.ends_at.unwrap_or(existing.ends_at);
    validate_window(starts_at, ends_at)?;

    let challenges = challenge::Entity::find()
        .filter(challenge::Column::EventId.eq(id))
        .all(&state.db)
        .await?;
    if let Some(outside) = challenges
        .iter()
        .find(|c| !window::contains_window((starts_at, ends_at), (c.starts_at, c.ends_at)))
    {
        return Err(AppError::Validation(format!(
            "Challenge '{}' would fall outside the event window",
            outside.title
        )));
    }

    let mut active: event::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    active.starts_at = Set(starts_at);
    active.ends_at = Set(ends_at);
    active.updated_at = Set(Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(EventResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Events",
    operation_id = "deleteEvent",
    summary = "Delete an event",
    description = "Deletes an event together with its teams, memberships, challenges, \
        attachments and solves. Refused while the event is running. Requires `event:manage`.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Event is running (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(EVENT_MANAGE)?;

    let txn = state.db.begin().await?;

    let existing = find_event(&txn, id).await?;
    if window::is_within(Utc::now(), existing.starts_at, existing.ends_at) {
        return Err(AppError::Conflict(
            "Cannot delete an event while it is running".into(),
        ));
    }

    let challenge_ids: Vec<i32> = challenge::Entity::find()
        .filter(challenge::Column::EventId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let solves = solve::Entity::delete_many()
        .filter(solve::Column::EventId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;
    team_member::Entity::delete_many()
        .filter(team_member::Column::EventId.eq(id))
        .exec(&txn)
        .await?;
    let teams = team::Entity::delete_many()
        .filter(team::Column::EventId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;
    practice_solve::Entity::delete_many()
        .filter(practice_solve::Column::ChallengeId.is_in(challenge_ids.clone()))
        .exec(&txn)
        .await?;
    let hashes: Vec<String> = challenge_file::Entity::find()
        .filter(challenge_file::Column::ChallengeId.is_in(challenge_ids.clone()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|f| f.content_hash)
        .collect();
    challenge_file::Entity::delete_many()
        .filter(challenge_file::Column::ChallengeId.is_in(challenge_ids.clone()))
        .exec(&txn)
        .await?;
    challenge::Entity::delete_many()
        .filter(challenge::Column::EventId.eq(id))
        .exec(&txn)
        .await?;
    event::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    release_blobs(&state, hashes).await?;
    tracing::info!(
        event_id = id,
        challenges = challenge_ids.len(),
        teams,
        solves,
        "Event deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/teams",
    tag = "Events",
    operation_id = "listEventTeams",
    summary = "List teams of an event",
    description = "All teams registered for the event, including ban state and invite token. \
        Requires `team:manage`.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Teams", body = Vec<AdminTeamResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_event_teams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<AdminTeamResponse>>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;
    find_event(&state.db, id).await?;

    let teams = team::Entity::find()
        .filter(team::Column::EventId.eq(id))
        .order_by_asc(team::Column::Id)
        .all(&state.db)
        .await?;

    let counts = membership::member_counts(&state.db, id).await?;

    Ok(Json(
        teams
            .into_iter()
            .map(|t| {
                let members = counts.get(&t.id).copied().unwrap_or(0);
                AdminTeamResponse::new(t, members)
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/cleanup",
    tag = "Events",
    operation_id = "cleanupEventTeams",
    summary = "Remove unused teams of a finished event",
    description = "Deletes every team of an ended event that holds no solve, with its \
        memberships. Teams with solves stay so standings keep their names. \
        Requires `team:manage`.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Cleanup done", body = CleanupResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Event has not ended (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn cleanup_event_teams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CleanupResponse>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;

    let txn = state.db.begin().await?;
    let existing = find_event(&txn, id).await?;
    if !window::has_ended(&existing, Utc::now()) {
        return Err(AppError::Conflict(
            "Event has not ended yet. Cleanup is allowed only after it ends".into(),
        ));
    }

    let scored: Vec<i32> = solve::Entity::find()
        .filter(solve::Column::EventId.eq(id))
        .select_only()
        .column(solve::Column::TeamId)
        .distinct()
        .into_tuple()
        .all(&txn)
        .await?;

    let unused: Vec<i32> = team::Entity::find()
        .filter(team::Column::EventId.eq(id))
        .filter(team::Column::Id.is_not_in(scored))
        .all(&txn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    team_member::Entity::delete_many()
        .filter(team_member::Column::TeamId.is_in(unused.clone()))
        .exec(&txn)
        .await?;
    let deleted_teams = team::Entity::delete_many()
        .filter(team::Column::Id.is_in(unused))
        .exec(&txn)
        .await?
        .rows_affected;
    txn.commit().await?;

    tracing::info!(event_id = id, deleted_teams, "Event teams cleaned up");
    Ok(Json(CleanupResponse {
        ok: true,
        deleted_teams,
    }))
}
