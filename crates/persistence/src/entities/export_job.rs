//! Export job entities.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use domain::errors::ExportError;
use domain::models::{
    ExportFormat, ExportJob, ExportJobLog, ExportJobStatus, ExportScope, ExportStage,
    JobLogLevel,
};

/// Database row for an export job.
#[derive(Debug, Clone, FromRow)]
pub struct ExportJobEntity {
    /// User-facing job identifier (export_<random>).
    pub job_id: String,
    pub project_id: Uuid,
    pub scope: String,
    pub format: String,
    pub decision_ids: Vec<Uuid>,
    pub branding_profile_id: Option<Uuid>,
    pub include_attachments: bool,
    pub created_by: Uuid,
    pub status: String,
    pub stage: String,
    pub progress: i32,
    pub artifact_url: Option<String>,
    pub artifact_path: Option<String>,
    pub artifact_size: Option<i64>,
    pub artifact_content_type: Option<String>,
    pub artifact_checksum: Option<String>,
    pub error_message: Option<String>,
    pub request_payload: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Column list matching [`ExportJobEntity`].
pub const EXPORT_JOB_COLUMNS: &str = "job_id, project_id, scope, format, decision_ids, \
    branding_profile_id, include_attachments, created_by, status, stage, progress, \
    artifact_url, artifact_path, artifact_size, artifact_content_type, artifact_checksum, \
    error_message, request_payload, created_at, updated_at, completed_at";

fn parse_column<T: FromStr<Err = String>>(job_id: &str, value: &str) -> Result<T, ExportError> {
    value
        .parse()
        .map_err(|e: String| ExportError::Data(format!("export_jobs {}: {}", job_id, e)))
}

impl TryFrom<ExportJobEntity> for ExportJob {
    type Error = ExportError;

    fn try_from(entity: ExportJobEntity) -> Result<Self, Self::Error> {
        let job_id = entity.job_id;
        let status: ExportJobStatus = parse_column(&job_id, &entity.status)?;
        let stage: ExportStage = parse_column(&job_id, &entity.stage)?;
        if stage.status() != status {
            return Err(ExportError::Data(format!(
                "export_jobs {}: stage {} does not match status {}",
                job_id, stage, status
            )));
        }
        if !(0..=100).contains(&entity.progress) {
            return Err(ExportError::Data(format!(
                "export_jobs {}: progress {} out of range",
                job_id, entity.progress
            )));
        }
        if status == ExportJobStatus::Completed && entity.artifact_url.is_none() {
            return Err(ExportError::Data(format!(
                "export_jobs {}: completed without artifact",
                job_id
            )));
        }

        Ok(ExportJob {
            scope: parse_column::<ExportScope>(&job_id, &entity.scope)?,
            format: parse_column::<ExportFormat>(&job_id, &entity.format)?,
            job_id,
            project_id: entity.project_id,
            decision_ids: entity.decision_ids,
            branding_profile_id: entity.branding_profile_id,
            include_attachments: entity.include_attachments,
            created_by: entity.created_by,
            status,
            stage,
            progress: entity.progress,
            artifact_url: entity.artifact_url,
            artifact_path: entity.artifact_path,
            artifact_size: entity.artifact_size,
            artifact_content_type: entity.artifact_content_type,
            artifact_checksum: entity.artifact_checksum,
            error_message: entity.error_message,
            request_payload: entity.request_payload,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            completed_at: entity.completed_at,
        })
    }
}

/// Database row for an export job log line.
#[derive(Debug, Clone, FromRow)]
pub struct ExportJobLogEntity {
    pub id: i64,
    pub job_id: String,
    pub level: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ExportJobLogEntity> for ExportJobLog {
    type Error = ExportError;

    fn try_from(entity: ExportJobLogEntity) -> Result<Self, Self::Error> {
        let level = JobLogLevel::from_str(&entity.level).map_err(|e| {
            ExportError::Data(format!("export_job_logs {}: {}", entity.id, e))
        })?;
        Ok(Self {
            level,
            message: entity.message,
            created_at: entity.created_at,
        })
    }
}
