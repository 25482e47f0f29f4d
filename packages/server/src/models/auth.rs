use serde::{Deserialize, Serialize};

use super::shared::validate_length;
use crate::error::AppError;

/// Request body for account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (3-24 chars, letters, digits and underscores).
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Unique email address. Stored lower-cased.
    #[schema(example = "alice@uni.example")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Must equal `password`.
    #[schema(example = "s3cure_P@ss!")]
    pub confirm_password: String,
}

/// 3-24 characters, ASCII letters, digits and underscores.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    validate_length("Username", username, 3, 24)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

/// One `@`, non-empty on both sides, no whitespace. `email_domain` restricts the domain.
pub fn validate_email(email: &str, email_domain: Option<&str>) -> Result<(), AppError> {
    let email = email.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AppError::Validation("Invalid email address".into()));
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
    {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if let Some(required) = email_domain
        && !domain.eq_ignore_ascii_case(required)
    {
        return Err(AppError::Validation(format!(
            "Only @{required} emails are allowed"
        )));
    }
    Ok(())
}

/// Validate a registration request. `email_domain` restricts addresses to that domain.
pub fn validate_register_request(
    payload: &RegisterRequest,
    email_domain: Option<&str>,
) -> Result<(), AppError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email, email_domain)?;

    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    if payload.password != payload.confirm_password {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username or email of the account.
    #[schema(example = "alice_wonder")]
    pub username: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice_wonder")]
    pub username: String,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = "alice_wonder")]
    pub username: String,
    #[schema(example = "player")]
    pub role: String,
    #[schema(example = json!(["flag:submit"]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's identity.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice_wonder")]
    pub username: String,
    #[schema(example = "player")]
    pub role: String,
    #[schema(example = json!(["flag:submit"]))]
    pub permissions: Vec<String>,
}
