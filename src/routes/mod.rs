//! HTTP routes
//!
//! Router assembly, health endpoints, and the error-to-status mapping
//! shared by all handlers.

pub mod auth_routes;
pub mod file_routes;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::bridge::BridgeError;
use crate::server::AppState;
use crate::types::VaultError;

/// Create the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/health/db", get(health_db))
        // Authentication
        .route("/auth/register", post(auth_routes::register))
        .route("/auth/login", post(auth_routes::login))
        .route("/auth/me", get(auth_routes::me))
        // File transfer. Uploads stream straight to the storage node in
        // bounded chunks, so the request-body size cap does not apply.
        .route("/files", get(file_routes::list_files))
        .route(
            "/files/:filename",
            post(file_routes::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/files/:id/download", get(file_routes::download_file))
        .with_state(state)
}

/// Service banner
async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "status": "VaultMesh control plane online",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness probe
async fn health() -> &'static str {
    "OK"
}

/// Metadata store probe
async fn health_db(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.ping().await?;
    Ok(Json(json!({ "database": "connected" })))
}

/// Client-facing error: a status code and a safe message.
///
/// Internal detail stays in the logs; the body carries only what the
/// client can act on.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.to_string(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match &e {
            BridgeError::NodeUnreachable { .. } | BridgeError::Closed => {
                error!(error = %e, "storage node unavailable");
                Self {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: "storage node is unavailable".to_string(),
                }
            }
            BridgeError::ShortBody { declared, sent } => Self {
                status: StatusCode::BAD_REQUEST,
                message: format!("request body ended after {sent} of {declared} declared bytes"),
            },
            BridgeError::FilenameTooLong { .. } => Self {
                status: StatusCode::BAD_REQUEST,
                message: e.to_string(),
            },
            BridgeError::Frame(_) => {
                error!(error = %e, "storage node protocol violation");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "storage node protocol violation".to_string(),
                }
            }
            BridgeError::Source(_) | BridgeError::Io(_) => {
                error!(error = %e, "transfer failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "transfer failed".to_string(),
                }
            }
        }
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::Auth(message) => Self {
                status: StatusCode::UNAUTHORIZED,
                message,
            },
            VaultError::Bridge(bridge) => bridge.into(),
            other => {
                error!(error = %other, "internal error");
                Self::internal("internal error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameError;
    use std::io;

    #[test]
    fn test_bridge_error_status_mapping() {
        let unreachable = BridgeError::NodeUnreachable {
            addr: "127.0.0.1:9000".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(
            ApiError::from(unreachable).status,
            StatusCode::SERVICE_UNAVAILABLE
        );

        let short = BridgeError::ShortBody {
            declared: 10,
            sent: 3,
        };
        assert_eq!(ApiError::from(short).status, StatusCode::BAD_REQUEST);

        let garbled = BridgeError::Frame(FrameError::Truncated { got: 7 });
        assert_eq!(
            ApiError::from(garbled).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let stranger = BridgeError::Frame(FrameError::BadMagic { magic: 0x47 });
        assert_eq!(
            ApiError::from(stranger).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_is_401() {
        let e = VaultError::Auth("bad token".to_string());
        assert_eq!(ApiError::from(e).status, StatusCode::UNAUTHORIZED);
    }
}
