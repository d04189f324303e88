//! Authentication endpoints
//!
//! - `POST /auth/register` - create credentials
//! - `POST /auth/login`    - authenticate and get a JWT
//! - `GET  /auth/me`       - identity echo from a valid token

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::db::NewUser;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: u64,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(ApiError::bad_request("a valid email is required"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    if state.db.find_user_by_email(&req.email).await?.is_some() {
        return Err(ApiError::bad_request("email already registered"));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(NewUser {
            email: req.email,
            password_hash,
            full_name: req.full_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "user created successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state.db.find_user_by_email(&req.email).await?;

    // Same rejection for unknown email and wrong password.
    let user = match user {
        Some(user) if user.is_active && verify_password(&req.password, &user.password_hash)? => {
            user
        }
        _ => return Err(ApiError::unauthorized("incorrect email or password")),
    };

    let (token, expires_at) = state.jwt.issue(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, "login");

    Ok(Json(AuthResponse {
        token,
        token_type: "bearer".to_string(),
        expires_at,
        email: user.email,
        role: user.role.as_str().to_string(),
    }))
}

/// GET /auth/me
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
    })
}
