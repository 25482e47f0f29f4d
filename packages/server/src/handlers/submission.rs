use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::submission::{
    HintRequest, HintResponse, PracticeSubmitResponse, SubmitFlagRequest, SubmitFlagResponse,
};
use crate::scoring::{evaluator, hints};
use crate::seed::permissions::FLAG_SUBMIT;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/submit",
    tag = "Challenges",
    operation_id = "submitFlag",
    summary = "Submit a flag",
    description = "Competitive submission for the caller's team. A team is credited once per \
        challenge; later correct or incorrect submissions by any member report \
        `already_solved` without awarding points.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = SubmitFlagRequest,
    responses(
        (status = 200, description = "Accepted or already solved", body = SubmitFlagResponse),
        (status = 400, description = "Empty flag (VALIDATION_ERROR) or wrong flag (INCORRECT_FLAG)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "No team or challenge closed (FORBIDDEN, PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Challenge not in the running event (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "No running event (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, challenge_id))]
pub async fn submit_flag(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<SubmitFlagRequest>,
) -> Result<Json<SubmitFlagResponse>, AppError> {
    auth_user.require_permission(FLAG_SUBMIT)?;

    let outcome = evaluator::submit_flag(
        &state.db,
        auth_user.user_id,
        challenge_id,
        &payload.flag,
        Utc::now(),
    )
    .await?;

    Ok(Json(SubmitFlagResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/{id}/submit",
    tag = "Practice",
    operation_id = "submitPracticeFlag",
    summary = "Submit a practice flag",
    description = "Checks a flag for a challenge whose event has ended. Awards no points. \
        A wrong flag is reported as `correct: false`, not as an error.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = SubmitFlagRequest,
    responses(
        (status = 200, description = "Evaluation result", body = PracticeSubmitResponse),
        (status = 400, description = "Empty flag (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Event not over yet (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, challenge_id))]
pub async fn submit_practice(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<SubmitFlagRequest>,
) -> Result<Json<PracticeSubmitResponse>, AppError> {
    let outcome = evaluator::submit_practice(
        &state.db,
        auth_user.user_id,
        challenge_id,
        &payload.flag,
        Utc::now(),
    )
    .await?;

    Ok(Json(PracticeSubmitResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/{id}/hint",
    tag = "Practice",
    operation_id = "practiceHint",
    summary = "Get a practice hint",
    description = "Returns the requested hint tier for a challenge whose event has ended. \
        Tiers run from 1 (general) to 3 (most specific) and depend only on the category.",
    params(("id" = i32, Path, description = "Challenge ID")),
    request_body = HintRequest,
    responses(
        (status = 200, description = "Hint", body = HintResponse),
        (status = 400, description = "Tier out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Event not over yet (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Challenge not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, challenge_id, tier = payload.tier))]
pub async fn practice_hint(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<i32>,
    AppJson(payload): AppJson<HintRequest>,
) -> Result<Json<HintResponse>, AppError> {
    let hint = hints::practice_hint(&state.db, challenge_id, payload.tier, Utc::now()).await?;

    Ok(Json(HintResponse {
        tier: payload.tier,
        hint: hint.to_owned(),
        has_more: payload.tier < hints::MAX_TIER,
    }))
}
