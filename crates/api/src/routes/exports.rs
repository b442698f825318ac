//! Export job endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use domain::models::{
    CreateExportRequest, CreateExportResponse, ExportStatusQuery, ExportStatusResponse,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Create an export and run it to completion.
///
/// POST /api/v1/exports
///
/// The caller is authenticated before the body is parsed, so a request
/// without a valid token is rejected with 401 whatever its payload.
pub async fn create_export(
    State(state): State<AppState>,
    auth: UserAuth,
    payload: Result<Json<CreateExportRequest>, JsonRejection>,
) -> Result<Json<CreateExportResponse>, ApiError> {
    let Json(request) = payload?;

    tracing::info!(
        user_id = %auth.user_id,
        project_id = ?request.project_id,
        format = ?request.format,
        "Export requested"
    );

    let response = state.exports.create_export(auth.user_id, request).await?;
    Ok(Json(response))
}

/// Get the status of an export job.
///
/// GET /api/v1/exports/status?jobId=...
pub async fn get_export_status(
    State(state): State<AppState>,
    auth: UserAuth,
    query: Result<Query<ExportStatusQuery>, QueryRejection>,
) -> Result<Json<ExportStatusResponse>, ApiError> {
    let Query(query) = query?;
    let status = state
        .status
        .get_status(auth.user_id, query.job_id.as_deref())
        .await?;
    Ok(Json(status))
}

/// GET /api/v1/exports/:job_id
pub async fn get_export_by_id(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(job_id): Path<String>,
) -> Result<Json<ExportStatusResponse>, ApiError> {
    let status = state.status.get_status(auth.user_id, Some(&job_id)).await?;
    Ok(Json(status))
}
