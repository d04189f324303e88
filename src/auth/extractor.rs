//! Authenticated-caller extractor
//!
//! Resolves `Authorization: Bearer <token>` into an identity before any
//! handler body runs; handlers that take an [`AuthUser`] cannot be reached
//! unauthenticated.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use super::jwt::extract_bearer;
use super::Role;
use crate::routes::ApiError;
use crate::server::AppState;

/// The authenticated caller, as proven by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner-or-admin check used by file listing and download.
    pub fn may_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = extract_bearer(header_value)
            .ok_or_else(|| ApiError::unauthorized("expected a bearer token"))?;

        let claims = state
            .jwt
            .validate(token)
            .map_err(|e| ApiError::unauthorized(&e.to_string()))?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}
