//! File transfer endpoints
//!
//! - `GET  /files`                - list records (admin: all, user: own)
//! - `POST /files/{filename}`     - upload the raw request body
//! - `GET  /files/{id}/download`  - stream a file back, as an attachment
//!
//! Uploads send the raw body, not multipart: the wire header commits to
//! the total size before the first body byte, so `Content-Length` is
//! required and chunked requests are rejected up front.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::auth::AuthUser;
use crate::db::NewFile;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_id: Uuid,
}

/// GET /files
pub async fn list_files(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let records = if user.is_admin() {
        state.db.list_files().await?
    } else {
        state.db.list_files_by_owner(user.id).await?
    };

    Ok(Json(
        records
            .into_iter()
            .map(|r| FileResponse {
                id: r.id,
                filename: r.filename,
                size_bytes: r.size_bytes,
                uploaded_at: r.uploaded_at,
            })
            .collect(),
    ))
}

/// POST /files/{filename}
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(filename): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    validate_filename(&filename)?;

    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(ApiError {
            status: StatusCode::LENGTH_REQUIRED,
            message: "Content-Length is required for uploads".to_string(),
        })?;

    let receipt = state
        .bridge
        .relay_upload(&filename, declared_len, body.into_data_stream())
        .await?;

    // The record is written only after the node has the bytes; a failure
    // past this point leaves the bytes on the node without a record, which
    // the metadata layer owns.
    let record = state
        .db
        .insert_file(NewFile {
            filename: receipt.filename,
            size_bytes: receipt.size_bytes,
            owner_id: user.id,
            node_addr: state.bridge.node_addr().to_string(),
        })
        .await?;

    info!(file_id = %record.id, owner = %user.id, "upload recorded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "upload successful".to_string(),
            file_id: record.id,
        }),
    ))
}

/// GET /files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let record = state
        .db
        .get_file(id)
        .await?
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    if !user.may_access(record.owner_id) {
        return Err(ApiError::forbidden("not authorized"));
    }

    let stream = state.bridge.relay_download(&record.filename).await?;
    let declared_len = stream.declared_len();

    info!(file_id = %record.id, declared_len, "download streaming");

    // Content-Length comes from the node's response header. A node that
    // closes early makes the body stream error out, aborting the response
    // mid-transfer instead of quietly ending short.
    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, declared_len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.filename.replace('"', "")),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(&format!("failed to build response: {e}")))
}

/// Reject names the storage node would misuse as paths, before a relay
/// session is spent on them.
fn validate_filename(filename: &str) -> Result<(), ApiError> {
    if filename.is_empty() {
        return Err(ApiError::bad_request("filename must not be empty"));
    }
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::bad_request("filename must not contain path segments"));
    }
    if filename.chars().any(char::is_control) {
        return Err(ApiError::bad_request("filename must not contain control characters"));
    }
    Ok(())
}
