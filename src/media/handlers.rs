use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use super::services::{upload_media, UploadItem};
use crate::{
    auth::extractors::AuthSession,
    error::{AppError, AppResult},
    state::AppState,
};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20MB

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/media", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /media (multipart, field `file`)
#[instrument(skip(state, claims, mp), fields(user_id = %claims.id))]
pub async fn upload(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    mut mp: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let storage = state
        .storage
        .clone()
        .ok_or_else(|| AppError::Unavailable("Media uploads are not configured".into()))?;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Unreadable upload: {}", e)))?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".into()));
        }

        let size = data.len();
        let url = upload_media(
            storage.as_ref(),
            &claims.id,
            UploadItem {
                body: data,
                content_type: &content_type,
            },
        )
        .await?;
        info!(%url, size, "media uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(AppError::MissingFields("file".into()))
}
