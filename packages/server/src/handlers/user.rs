use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{practice_solve, role, solve, team, team_member, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::user::*;
use crate::seed::permissions::USER_MANAGE;
use crate::state::AppState;

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "User Admin",
    operation_id = "adminGetUser",
    summary = "Get a user",
    description = "Requires `user:manage`.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = AdminUserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AdminUserResponse>, AppError> {
    auth_user.require_permission(USER_MANAGE)?;
    Ok(Json(AdminUserResponse::from(find_user(&state.db, id).await?)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "User Admin",
    operation_id = "adminUpdateUser",
    summary = "Update a user",
    description = "Partially updates username, email or role. Username and email follow the \
        registration rules and stay unique. A role change applies from the user's next login. \
        Requires `user:manage`.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = AdminUserResponse),
        (status = 400, description = "Validation error or unknown role (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Username or email taken (USERNAME_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<AdminUserResponse>, AppError> {
    auth_user.require_permission(USER_MANAGE)?;
    validate_update_user(&payload, state.config.auth.email_domain.as_deref())?;

    let existing = find_user(&state.db, id).await?;

    let username = payload.username.map(|u| u.trim().to_string());
    let email = payload.email.map(|e| e.trim().to_lowercase());

    let mut clash = Condition::any();
    if let Some(ref username) = username {
        clash = clash.add(user::Column::Username.eq(username));
    }
    if let Some(ref email) = email {
        clash = clash.add(user::Column::Email.eq(email));
    }
    if (username.is_some() || email.is_some())
        && user::Entity::find()
            .filter(clash)
            .filter(user::Column::Id.ne(id))
            .count(&state.db)
            .await?
            > 0
    {
        return Err(AppError::UsernameTaken);
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(username) = username {
        active.username = Set(username);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(role_name) = payload.role {
        let role_name = role_name.trim().to_string();
        if role::Entity::find_by_id(role_name.clone())
            .one(&state.db)
            .await?
            .is_none()
        {
            return Err(AppError::Validation(format!("Unknown role '{role_name}'")));
        }
        active.role = Set(role_name);
    }

    let model = active.update(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::UsernameTaken,
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = id, role = %model.role, "User updated");
    Ok(Json(AdminUserResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "User Admin",
    operation_id = "adminDeleteUser",
    summary = "Delete a user",
    description = "Deletes an account with its team memberships and practice solves. Refused \
        for the caller's own account, for team leaders and once the user holds a competitive \
        solve. Requires `user:manage`.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Own account, team leader or has solves (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(USER_MANAGE)?;
    if auth_user.user_id == id {
        return Err(AppError::Conflict("Cannot delete your own account".into()));
    }

    let txn = state.db.begin().await?;
    find_user(&txn, id).await?;

    let solves = solve::Entity::find()
        .filter(solve::Column::UserId.eq(id))
        .count(&txn)
        .await?;
    if solves > 0 {
        return Err(AppError::Conflict(
            "User has recorded solves and cannot be deleted".into(),
        ));
    }

    let leads = team::Entity::find()
        .filter(team::Column::LeaderId.eq(id))
        .count(&txn)
        .await?;
    if leads > 0 {
        return Err(AppError::Conflict(
            "User leads a team. Delete the team first".into(),
        ));
    }

    team_member::Entity::delete_many()
        .filter(team_member::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    practice_solve::Entity::delete_many()
        .filter(practice_solve::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
