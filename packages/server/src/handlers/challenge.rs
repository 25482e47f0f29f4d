use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use super::attachment::{files_by_challenge, release_blobs};
use super::{find_challenge, find_event};
use crate::entity::{challenge, challenge_file, event, practice_solve, solve};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::challenge::*;
use crate::models::event::EventResponse;
use crate::models::shared::{Pagination, validate_window};
use crate::scoring::{membership, window};
use crate::seed::permissions::CHALLENGE_MANAGE;
use crate::state::AppState;
use crate::utils::hash;

// ---------------------------------------------------------------------------
// Player board
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    tag = "Challenges",
    operation_id = "listChallenges",
    summary = "Challenge board",
    description = "Challenges of the running event whose own window is open, with a `solved` \
        flag for the caller's team. While the next event is upcoming the list is empty. \
        Requires a team once an event exists.",
    responses(
        (status = 200, description = "Challenge board", body = ChallengeBoardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "No team for the event (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_challenges(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ChallengeBoardResponse>, AppError> {
    let now = Utc::now();
    let ctx = window::resolve_event_context(&state.db, now).await?;

    let Some(event) = ctx.event else {
        return Ok(Json(ChallengeBoardResponse {
            mode: ctx.mode,
            event: None,
            team_name: None,
            challenges: Vec::new(),
        }));
    };

    let team = membership::find_team_for_user(&state.db, auth_user.user_id, event.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Create or join a team first".into()))?;

    if ctx.mode != window::EventMode::Active {
        return Ok(Json(ChallengeBoardResponse {
            mode: ctx.mode,
            event: Some(EventResponse::from(event)),
            team_name: Some(team.name),
            challenges: Vec::new(),
        }));
    }

    let open: Vec<challenge::Model> = challenge::Entity::find()
        .filter(challenge::Column::EventId.eq(event.id))
        .order_by_asc(challenge::Column::Points)
        .order_by_asc(challenge::Column::CreatedAt)
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|c| window::is_challenge_open(c, &event, now))
        .collect();

    let solved: HashSet<i32> = solve::Entity::find()
        .filter(solve::Column::EventId.eq(event.id))
        .filter(solve::Column::TeamId.eq(team.id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| s.challenge_id)
        .collect();

    let ids: Vec<i32> = open.iter().map(|c| c.id).collect();
    let mut files = files_by_challenge(&state.db, &ids).await?;

    let challenges = open
        .into_iter()
        .map(|c| {
            let is_solved = solved.contains(&c.id);
            let attachments = files.remove(&c.id).unwrap_or_default();
            ChallengeResponse::new(c, is_solved, attachments)
        })
        .collect();

    Ok(Json(ChallengeBoardResponse {
        mode: ctx.mode,
        event: Some(EventResponse::from(event)),
        team_name: Some(team.name),
        challenges,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Challenges",
    operation_id = "getChallenge",
    summary = "Challenge detail",
    description = "A released challenge of the running event. Challenges of other events, \
        and those not yet started, are reported as not found.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Challenge", body = ChallengeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let now = Utc::now();
    let event = window::active_event(&state.db, now)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;

    let challenge = find_challenge(&state.db, id).await?;
    if challenge.event_id != event.id || challenge.starts_at > now {
        return Err(AppError::NotFound("Challenge not found".into()));
    }

    let solved = match membership::find_team_for_user(&state.db, auth_user.user_id, event.id)
        .await?
    {
        Some(team) => {
            solve::Entity::find()
                .filter(solve::Column::TeamId.eq(team.id))
                .filter(solve::Column::ChallengeId.eq(challenge.id))
                .filter(solve::Column::EventId.eq(event.id))
                .count(&state.db)
                .await?
                > 0
        }
        None => false,
    };

    let files = files_by_challenge(&state.db, &[challenge.id])
        .await?
        .remove(&challenge.id)
        .unwrap_or_default();

    Ok(Json(ChallengeResponse::new(challenge, solved, files)))
}

// ---------------------------------------------------------------------------
// Practice board
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    tag = "Practice",
    operation_id = "listPracticeChallenges",
    summary = "Practice board",
    description = "Challenges of every event that has ended, most recently closed first, \
        with a `solved` flag for the caller's practice solves.",
    responses(
        (status = 200, description = "Practice challenges", body = Vec<PracticeChallengeResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_practice_challenges(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PracticeChallengeResponse>>, AppError> {
    let now = Utc::now();
    let ended: HashMap<i32, String> = event::Entity::find()
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|e| window::has_ended(e, now))
        .map(|e| (e.id, e.name))
        .collect();

    if ended.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let mut challenges = challenge::Entity::find()
        .filter(challenge::Column::EventId.is_in(ended.keys().copied().collect::<Vec<_>>()))
        .all(&state.db)
        .await?;
    challenges.sort_by(|a, b| {
        b.ends_at
            .cmp(&a.ends_at)
            .then_with(|| a.points.cmp(&b.points))
    });

    let solved: HashSet<i32> = practice_solve::Entity::find()
        .filter(practice_solve::Column::UserId.eq(auth_user.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|p| p.challenge_id)
        .collect();

    let ids: Vec<i32> = challenges.iter().map(|c| c.id).collect();
    let mut files = files_by_challenge(&state.db, &ids).await?;

    Ok(Json(
        challenges
            .into_iter()
            .map(|c| PracticeChallengeResponse {
                id: c.id,
                event_id: c.event_id,
                event_name: ended.get(&c.event_id).cloned().unwrap_or_default(),
                solved: solved.contains(&c.id),
                files: files.remove(&c.id).unwrap_or_default(),
                title: c.title,
                category: c.category,
                description: c.description,
                points: c.points,
            })
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

async fn solve_counts<C: ConnectionTrait>(
    db: &C,
    challenge_ids: &[i32],
) -> Result<HashMap<i32, u64>, DbErr> {
    let mut counts = HashMap::new();
    for s in solve::Entity::find()
        .filter(solve::Column::ChallengeId.is_in(challenge_ids.to_vec()))
        .all(db)
        .await?
    {
        *counts.entry(s.challenge_id).or_default() += 1;
    }
    Ok(counts)
}

async fn admin_response<C: ConnectionTrait>(
    db: &C,
    model: challenge::Model,
) -> Result<AdminChallengeResponse, AppError> {
    let files = files_by_challenge(db, &[model.id])
        .await?
        .remove(&model.id)
        .unwrap_or_default();
    let solves = solve_counts(db, &[model.id])
        .await?
        .get(&model.id)
        .copied()
        .unwrap_or(0);
    Ok(AdminChallengeResponse::new(model, files, solves))
}

fn require_inside_event(
    event: &event::Model,
    starts_at: chrono::DateTime<Utc>,
    ends_at: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    if !window::contains_window((event.starts_at, event.ends_at), (starts_at, ends_at)) {
        return Err(AppError::Validation(
            "Challenge window must lie inside the event window".into(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Challenge Admin",
    operation_id = "adminListChallenges",
    summary = "List challenges",
    description = "Paginated list of all challenges, optionally restricted to one event. \
        Requires `challenge:manage`.",
    params(AdminChallengeListQuery),
    responses(
        (status = 200, description = "Challenges", body = AdminChallengeListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn admin_list_challenges(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AdminChallengeListQuery>,
) -> Result<Json<AdminChallengeListResponse>, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;

    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = challenge::Entity::find();
    if let Some(event_id) = query.event_id {
        select = select.filter(challenge::Column::EventId.eq(event_id));
    }

    let paginator = select
        .order_by_desc(challenge::Column::CreatedAt)
        .order_by_desc(challenge::Column::Id)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let models = paginator.fetch_page(page - 1).await?;

    let ids: Vec<i32> = models.iter().map(|c| c.id).collect();
    let mut files = files_by_challenge(&state.db, &ids).await?;
    let counts = solve_counts(&state.db, &ids).await?;

    let data = models
        .into_iter()
        .map(|c| {
            let attachments = files.remove(&c.id).unwrap_or_default();
            let solves = counts.get(&c.id).copied().unwrap_or(0);
            AdminChallengeResponse::new(c, attachments, solves)
        })
        .collect();

    Ok(Json(AdminChallengeListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        },
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Challenge Admin",
    operation_id = "adminCreateChallenge",
    summary = "Create a challenge",
    description = "Creates a challenge. Without `event_id` the most recently created event is \
        used. The challenge window must lie inside the event window. The flag is stored \
        hashed. Requires `challenge:manage`.",
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge created", body = AdminChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No event exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn admin_create_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;
    validate_create_challenge(&payload)?;

    let event = match payload.event_id {
        Some(id) => find_event(&state.db, id).await?,
        None => event::Entity::find()
            .order_by_desc(event::Column::CreatedAt)
            .order_by_desc(event::Column::Id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::Conflict("Create an event first".into()))?,
    };
    require_inside_event(&event, payload.starts_at, payload.ends_at)?;

    let flag_hash = hash::hash_secret(payload.flag.trim())
        .map_err(|e| AppError::Internal(format!("Flag hash error: {}", e)))?;

    let now = Utc::now();
    let model = challenge::ActiveModel {
        event_id: Set(event.id),
        title: Set(payload.title.trim().to_string()),
        category: Set(payload.category),
        description: Set(payload.description),
        points: Set(payload.points),
        flag_hash: Set(flag_hash),
        starts_at: Set(payload.starts_at),
        ends_at: Set(payload.ends_at),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(challenge_id = model.id, event_id = event.id, "Challenge created");
    Ok((
        StatusCode::CREATED,
        Json(AdminChallengeResponse::new(model, Vec::new(), 0)),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Challenge Admin",
    operation_id = "adminGetChallenge",
    summary = "Get a challenge",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 200, description = "Challenge", body = AdminChallengeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn admin_get_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AdminChallengeResponse>, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;
    let model = find_challenge(&state.db, id).await?;
    Ok(Json(admin_response(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Challenge Admin",
    operation_id = "adminUpdateChallenge",
    summary = "Update a challenge",
    description = "Partially updates a challenge. A blank or missing `flag` keeps the current \
        flag. The resulting window must lie inside the event window. Points of solves already \
        recorded are not changed. Requires `challenge:manage`.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = UpdateChallengeRequest,
    responses(
        (status = 200, description = "Challenge updated", body = AdminChallengeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn admin_update_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateChallengeRequest>,
) -> Result<Json<AdminChallengeResponse>, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;
    validate_update_challenge(&payload)?;

    let existing = find_challenge(&state.db, id).await?;
    let event = find_event(&state.db, existing.event_id).await?;

    let starts_at = payload.starts_at.unwrap_or(existing.starts_at);
    let ends_at = payload.ends_at.unwrap_or(existing.ends_at);
    validate_window(starts_at, ends_at)?;
    require_inside_event(&event, starts_at, ends_at)?;

    let mut active: challenge::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(points) = payload.points {
        active.points = Set(points);
    }
    if let Some(flag) = payload.flag.as_deref().map(str::trim)
        && !flag.is_empty()
    {
        let flag_hash = hash::hash_secret(flag)
            .map_err(|e| AppError::Internal(format!("Flag hash error: {}", e)))?;
        active.flag_hash = Set(flag_hash);
    }
    active.starts_at = Set(starts_at);
    active.ends_at = Set(ends_at);
    active.updated_at = Set(Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(admin_response(&state.db, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Challenge Admin",
    operation_id = "adminDeleteChallenge",
    summary = "Delete a challenge",
    description = "Deletes a challenge with its attachments and practice solves. Blobs no \
        other attachment shares are removed from the store. Refused once any team holds \
        credit for it. Requires `challenge:manage`.",
    params(("id" = i32, Path, description = "Challenge ID")),
    responses(
        (status = 204, description = "Challenge deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Challenge has solves (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn admin_delete_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(CHALLENGE_MANAGE)?;

    let txn = state.db.begin().await?;
    find_challenge(&txn, id).await?;

    let solves = solve::Entity::find()
        .filter(solve::Column::ChallengeId.eq(id))
        .count(&txn)
        .await?;
    if solves > 0 {
        return Err(AppError::Conflict(
            "Challenge has recorded solves and cannot be deleted".into(),
        ));
    }

    let hashes: Vec<String> = challenge_file::Entity::find()
        .filter(challenge_file::Column::ChallengeId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|f| f.content_hash)
        .collect();

    practice_solve::Entity::delete_many()
        .filter(practice_solve::Column::ChallengeId.eq(id))
        .exec(&txn)
        .await?;
    challenge_file::Entity::delete_many()
        .filter(challenge_file::Column::ChallengeId.eq(id))
        .exec(&txn)
        .await?;
    challenge::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    release_blobs(&state, hashes).await?;
    tracing::info!(challenge_id = id, "Challenge deleted");
    Ok(StatusCode::NO_CONTENT)
}
