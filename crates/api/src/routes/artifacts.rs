//! Signed artifact downloads for the local storage backend.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use domain::models::ArtifactKind;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::SignedUrlError;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET /api/v1/artifacts/*path?expires=...&signature=...
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(path): Path<String>,
    query: Option<Query<SignedQuery>>,
) -> Result<Response, ApiError> {
    let storage = state
        .local_artifacts
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Artifact not found".to_string()))?;

    let Query(query) =
        query.ok_or_else(|| ApiError::Forbidden("Missing or invalid signature".to_string()))?;

    let file_path = storage
        .verify(&path, query.expires, &query.signature, Utc::now().timestamp())
        .map_err(|e| match e {
            SignedUrlError::InvalidPath => ApiError::NotFound("Artifact not found".to_string()),
            SignedUrlError::InvalidSignature | SignedUrlError::Expired => {
                ApiError::Forbidden(e.to_string())
            }
        })?;

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("Artifact not found".to_string()));
        }
        Err(e) => return Err(ApiError::Internal(format!("Failed to open artifact: {}", e))),
    };

    let content_type = std::path::Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ArtifactKind::from_extension)
        .map(|kind| kind.content_type())
        .unwrap_or("application/octet-stream");

    let filename = file_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("export");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, no-store")),
        ],
        body,
    )
        .into_response())
}
