//! Product image uploads.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{object_key, StorageError};

/// Upload query parameters.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Original file name.
    pub filename: String,
}

/// Stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Object key.
    pub key: String,
    /// Public URL of the object.
    pub url: String,
}

/// Store a raw image body and return its URL.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !content_type.starts_with("image/") {
        return Err(ApiError::BadRequest(
            "Only image uploads are accepted".into(),
        ));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Upload body is empty".into()));
    }

    let key = object_key(&query.filename, &body);
    let url = state
        .objects
        .put(&key, &body, content_type)
        .await
        .map_err(|e| match e {
            StorageError::InvalidKey(_) => ApiError::BadRequest(e.to_string()),
            StorageError::Io(_) => ApiError::Internal(e.to_string()),
        })?;

    tracing::info!(admin_id = %admin.user_id, key = %key, "Image uploaded");

    Ok((StatusCode::CREATED, Json(UploadResponse { key, url })))
}
