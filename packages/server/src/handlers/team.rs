use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use super::find_team;
use crate::entity::{solve, team, team_member};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::event::EventResponse;
use crate::models::shared::validate_length;
use crate::models::team::*;
use crate::scoring::{membership, window};
use crate::seed::permissions::TEAM_MANAGE;
use crate::state::AppState;

const NO_EVENT: &str = "No event exists. Admin must create an event first";

#[utoipa::path(
    get,
    path = "/",
    tag = "Teams",
    operation_id = "listTeams",
    summary = "Teams of the running event",
    description = "Public list of the running event's teams, newest first, with member \
        counts. `event` is null and the list empty when no event is running.",
    responses(
        (status = 200, description = "Teams", body = TeamListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_teams(State(state): State<AppState>) -> Result<Json<TeamListResponse>, AppError> {
    let Some(event) = window::active_event(&state.db, Utc::now()).await? else {
        return Ok(Json(TeamListResponse {
            event: None,
            teams: Vec::new(),
        }));
    };

    let teams = team::Entity::find()
        .filter(team::Column::EventId.eq(event.id))
        .order_by_desc(team::Column::CreatedAt)
        .order_by_desc(team::Column::Id)
        .all(&state.db)
        .await?;
    let counts = membership::member_counts(&state.db, event.id).await?;

    Ok(Json(TeamListResponse {
        event: Some(EventResponse::from(event)),
        teams: teams
            .into_iter()
            .map(|t| {
                let members = counts.get(&t.id).copied().unwrap_or(0);
                PublicTeamResponse::new(t, members)
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Teams",
    operation_id = "createTeam",
    summary = "Create a team",
    description = "Creates a team in the running event, or the next upcoming one. The caller \
        becomes leader and first member. A user can hold one team per event.",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamMembershipResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "No event, name taken, or already in a team (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamMembershipResponse>), AppError> {
    validate_create_team(&payload)?;

    let now = Utc::now();
    let ctx = window::resolve_event_context(&state.db, now).await?;
    let event = ctx.event.ok_or_else(|| AppError::Conflict(NO_EVENT.into()))?;

    let created = membership::create_team(
        &state.db,
        auth_user.user_id,
        event.id,
        payload.name.trim(),
        payload.password.trim(),
        now,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(TeamMembershipResponse {
            ok: true,
            mode: ctx.mode,
            event_id: event.id,
            team: TeamResponse::new(created, 1),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/join",
    tag = "Teams",
    operation_id = "joinTeam",
    summary = "Join a team",
    description = "Joins the team of the current event holding the invite token. Tokens do not \
        carry over between events. Joining the caller's own team again changes nothing.",
    request_body = JoinTeamRequest,
    responses(
        (status = 200, description = "Joined", body = TeamMembershipResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Team is banned (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Invalid invite token (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No event, or already in another team (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn join_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<JoinTeamRequest>,
) -> Result<Json<TeamMembershipResponse>, AppError> {
    validate_join_team(&payload)?;

    let now = Utc::now();
    let ctx = window::resolve_event_context(&state.db, now).await?;
    let event = ctx.event.ok_or_else(|| AppError::Conflict(NO_EVENT.into()))?;

    let joined = membership::join_team(
        &state.db,
        auth_user.user_id,
        event.id,
        &payload.invite_token,
        now,
    )
    .await?;
    let members = membership::member_count(&state.db, joined.id).await?;

    Ok(Json(TeamMembershipResponse {
        ok: true,
        mode: ctx.mode,
        event_id: event.id,
        team: TeamResponse::new(joined, members),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Teams",
    operation_id = "myTeam",
    summary = "Caller's team",
    description = "The caller's team in the running or next event. `has_team` is false when \
        the caller has none or no event exists.",
    responses(
        (status = 200, description = "Team status", body = MyTeamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MyTeamResponse>, AppError> {
    let ctx = window::resolve_event_context(&state.db, Utc::now()).await?;
    let Some(event) = ctx.event else {
        return Ok(Json(MyTeamResponse {
            has_team: false,
            mode: ctx.mode,
            event_id: None,
            team: None,
        }));
    };

    let team = match membership::find_team_for_user(&state.db, auth_user.user_id, event.id).await? {
        Some(team) => {
            let members = membership::member_count(&state.db, team.id).await?;
            Some(TeamResponse::new(team, members))
        }
        None => None,
    };

    Ok(Json(MyTeamResponse {
        has_team: team.is_some(),
        mode: ctx.mode,
        event_id: Some(event.id),
        team,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Team Admin",
    operation_id = "renameTeam",
    summary = "Rename a team",
    description = "Requires `team:manage`. Names stay unique within the event.",
    params(("id" = i32, Path, description = "Team ID")),
    request_body = RenameTeamRequest,
    responses(
        (status = 200, description = "Team renamed", body = AdminTeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn rename_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RenameTeamRequest>,
) -> Result<Json<AdminTeamResponse>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;
    validate_length("Team name", &payload.name, 2, 40)?;

    let existing = find_team(&state.db, id).await?;
    let mut active: team::ActiveModel = existing.into();
    active.name = Set(payload.name.trim().to_string());

    let model = active.update(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Team name already taken".into())
        }
        _ => AppError::from(e),
    })?;
    let members = membership::member_count(&state.db, model.id).await?;
    Ok(Json(AdminTeamResponse::new(model, members)))
}

#[utoipa::path(
    post,
    path = "/{id}/ban",
    tag = "Team Admin",
    operation_id = "banTeam",
    summary = "Ban or unban a team",
    description = "Sets the ban flag and reason. Banned teams cannot take new members; their \
        solves still count on the leaderboard. Requires `team:manage`.",
    params(("id" = i32, Path, description = "Team ID")),
    request_body = BanTeamRequest,
    responses(
        (status = 200, description = "Ban state updated", body = AdminTeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, banned = payload.banned))]
pub async fn ban_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<BanTeamRequest>,
) -> Result<Json<AdminTeamResponse>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;
    validate_ban_team(&payload)?;

    let existing = find_team(&state.db, id).await?;
    let mut active: team::ActiveModel = existing.into();
    if payload.banned {
        active.banned = Set(true);
        active.ban_reason = Set(payload.reason.trim().to_string());
        active.banned_at = Set(Some(Utc::now()));
    } else {
        active.banned = Set(false);
        active.ban_reason = Set(String::new());
        active.banned_at = Set(None);
    }

    let model = active.update(&state.db).await?;
    tracing::info!(team_id = id, banned = model.banned, "Team ban state changed");
    let members = membership::member_count(&state.db, model.id).await?;
    Ok(Json(AdminTeamResponse::new(model, members)))
}

#[utoipa::path(
    post,
    path = "/{id}/rotate-invite",
    tag = "Team Admin",
    operation_id = "rotateTeamInvite",
    summary = "Rotate a team's invite token",
    description = "Replaces the invite token; the old one stops working. Requires `team:manage`.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Token rotated", body = AdminTeamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn rotate_invite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AdminTeamResponse>, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;

    let existing = find_team(&state.db, id).await?;
    let token = membership::unused_invite_token(&state.db).await?;

    let mut active: team::ActiveModel = existing.into();
    active.invite_token = Set(token);
    let model = active.update(&state.db).await?;

    let members = membership::member_count(&state.db, model.id).await?;
    Ok(Json(AdminTeamResponse::new(model, members)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Team Admin",
    operation_id = "deleteTeam",
    summary = "Delete a team",
    description = "Deletes a team and its memberships. Refused once the team holds any solve. \
        Requires `team:manage`.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 204, description = "Team deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Team has solves (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(TEAM_MANAGE)?;

    let txn = state.db.begin().await?;
    find_team(&txn, id).await?;

    let solves = solve::Entity::find()
        .filter(solve::Column::TeamId.eq(id))
        .count(&txn)
        .await?;
    if solves > 0 {
        return Err(AppError::Conflict(
            "Team has recorded solves and cannot be deleted".into(),
        ));
    }

    team_member::Entity::delete_many()
        .filter(team_member::Column::TeamId.eq(id))
        .exec(&txn)
        .await?;
    team::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(team_id = id, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}
