use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::{validate_email, validate_username};
use crate::error::AppError;

/// Account as seen by administrators. Never carries the password hash.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminUserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice_wonder")]
    pub username: String,
    #[schema(example = "alice@uni.example")]
    pub email: String,
    #[schema(example = "player")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for AdminUserResponse {
    fn from(m: crate::entity::user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    /// Same rules as registration.
    pub username: Option<String>,
    /// Same rules as registration, including the configured domain.
    pub email: Option<String>,
    /// Name of a seeded role.
    #[schema(example = "admin")]
    pub role: Option<String>,
}

/// Field-level checks. Role existence is checked by the handler.
pub fn validate_update_user(
    payload: &UpdateUserRequest,
    email_domain: Option<&str>,
) -> Result<(), AppError> {
    if let Some(ref username) = payload.username {
        validate_username(username)?;
    }
    if let Some(ref email) = payload.email {
        validate_email(email, email_domain)?;
    }
    if let Some(ref role) = payload.role
        && role.trim().is_empty()
    {
        return Err(AppError::Validation("Role must not be empty".into()));
    }
    Ok(())
}
