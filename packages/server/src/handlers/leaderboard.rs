use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::Utc;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::event::EventResponse;
use crate::models::leaderboard::*;
use crate::scoring::{leaderboard, window};
use crate::state::AppState;

/// `(event, event_id filter, limit)` for the requested scope, or `None` when the
/// event scope was requested while nothing is running.
async fn resolve_scope(
    state: &AppState,
    scope: LeaderboardScope,
) -> Result<Option<(Option<EventResponse>, Option<i32>, usize)>, AppError> {
    match scope {
        LeaderboardScope::Global => Ok(Some((None, None, state.config.leaderboard.global_limit))),
        LeaderboardScope::Event => {
            let Some(event) = window::active_event(&state.db, Utc::now()).await? else {
                return Ok(None);
            };
            let id = event.id;
            Ok(Some((
                Some(EventResponse::from(event)),
                Some(id),
                state.config.leaderboard.event_limit,
            )))
        }
    }
}

#[utoipa::path(
    get,
    path = "/individual",
    tag = "Leaderboard",
    operation_id = "individualLeaderboard",
    summary = "Individual standings",
    description = "Users ranked by points from the solves they submitted, then by solve count. \
        `scope=event` restricts to the running event and reports `active: false` with no rows \
        when nothing is running.",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Standings", body = IndividualLeaderboardResponse),
        (status = 400, description = "Unknown scope (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn individual(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<IndividualLeaderboardResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let Some((event, event_id, limit)) = resolve_scope(&state, query.scope).await? else {
        return Ok(Json(IndividualLeaderboardResponse {
            active: false,
            event: None,
            rows: Vec::new(),
        }));
    };

    let rows = leaderboard::individual_standings(&state.db, event_id, limit).await?;
    Ok(Json(IndividualLeaderboardResponse {
        active: true,
        event,
        rows,
    }))
}

#[utoipa::path(
    get,
    path = "/teams",
    tag = "Leaderboard",
    operation_id = "teamLeaderboard",
    summary = "Team standings",
    description = "Teams ranked by points, then by solve count. `scope=event` restricts to the \
        running event and reports `active: false` with no rows when nothing is running.",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Standings", body = TeamLeaderboardResponse),
        (status = 400, description = "Unknown scope (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn teams(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<TeamLeaderboardResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let Some((event, event_id, limit)) = resolve_scope(&state, query.scope).await? else {
        return Ok(Json(TeamLeaderboardResponse {
            active: false,
            event: None,
            rows: Vec::new(),
        }));
    };

    let rows = leaderboard::team_standings(&state.db, event_id, limit).await?;
    Ok(Json(TeamLeaderboardResponse {
        active: true,
        event,
        rows,
    }))
}
