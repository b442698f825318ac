//! Export job repository for database operations.
//!
//! Transition updates are guarded in SQL: only `processing` jobs change, and
//! progress never decreases.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use domain::errors::ExportError;
use domain::models::{
    ExportJob, ExportJobLog, ExportStage, JobLogLevel, JobTransition, NewExportJob,
};
use domain::services::ExportJobStore;

use crate::entities::{ExportJobEntity, ExportJobLogEntity, EXPORT_JOB_COLUMNS};
use crate::metrics::QueryTimer;

/// Repository for export jobs and their log lines.
#[derive(Clone)]
pub struct ExportJobRepository {
    pool: PgPool,
}

impl ExportJobRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ExportJobStore for ExportJobRepository {
    async fn create_job(&self, job: NewExportJob) -> Result<ExportJob, ExportError> {
        let timer = QueryTimer::new("create_export_job");
        let query = format!(
            r#"
            INSERT INTO export_jobs (
                job_id, project_id, scope, format, decision_ids, branding_profile_id,
                include_attachments, created_by, status, stage, progress, request_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'processing', 'pending', 0, $9)
            RETURNING {}
            "#,
            EXPORT_JOB_COLUMNS
        );
        let result = sqlx::query_as::<_, ExportJobEntity>(&query)
            .bind(&job.job_id)
            .bind(job.project_id)
            .bind(job.scope.to_string())
            .bind(job.format.as_str())
            .bind(&job.decision_ids)
            .bind(job.branding_profile_id)
            .bind(job.include_attachments)
            .bind(job.created_by)
            .bind(&job.request_payload)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        ExportJob::try_from(result?)
    }

    async fn apply_transition(
        &self,
        job_id: &str,
        transition: &JobTransition,
    ) -> Result<bool, ExportError> {
        let timer = QueryTimer::new("apply_export_job_transition");
        let result = match transition {
            JobTransition::Advance(stage) => {
                let progress = stage.progress().unwrap_or_default();
                sqlx::query(
                    r#"
                    UPDATE export_jobs
                    SET stage = $2, progress = $3, updated_at = NOW()
                    WHERE job_id = $1 AND status = 'processing' AND progress <= $3
                    "#,
                )
                .bind(job_id)
                .bind(stage.to_string())
                .bind(progress)
                .execute(&self.pool)
                .await
            }
            JobTransition::Complete(artifact) => {
                sqlx::query(
                    r#"
                    UPDATE export_jobs
                    SET status = 'completed', stage = 'completed', progress = 100,
                        artifact_url = $2, artifact_path = $3, artifact_size = $4,
                        artifact_content_type = $5, artifact_checksum = $6,
                        updated_at = NOW(), completed_at = NOW()
                    WHERE job_id = $1 AND status = 'processing' AND stage = $7
                    "#,
                )
                .bind(job_id)
                .bind(&artifact.url)
                .bind(&artifact.path)
                .bind(artifact.size)
                .bind(&artifact.content_type)
                .bind(&artifact.checksum)
                .bind(ExportStage::Uploading.to_string())
                .execute(&self.pool)
                .await
            }
            JobTransition::Fail(message) => {
                sqlx::query(
                    r#"
                    UPDATE export_jobs
                    SET status = 'failed', stage = 'failed', error_message = $2,
                        updated_at = NOW(), completed_at = NOW()
                    WHERE job_id = $1 AND status = 'processing'
                    "#,
                )
                .bind(job_id)
                .bind(message)
                .execute(&self.pool)
                .await
            }
        };
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn append_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
    ) -> Result<(), ExportError> {
        let timer = QueryTimer::new("append_export_job_log");
        let result = sqlx::query(
            r#"
            INSERT INTO export_job_logs (job_id, level, message)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(job_id)
        .bind(level.to_string())
        .bind(message)
        .execute(&self.pool)
        .await;
        timer.record();
        result?;
        Ok(())
    }

    async fn find_job(&self, job_id: &str) -> Result<Option<ExportJob>, ExportError> {
        let timer = QueryTimer::new("find_export_job");
        let query = format!(
            "SELECT {} FROM export_jobs WHERE job_id = $1",
            EXPORT_JOB_COLUMNS
        );
        let result = sqlx::query_as::<_, ExportJobEntity>(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result?.map(ExportJob::try_from).transpose()
    }

    async fn recent_logs(&self, job_id: &str, limit: i64) -> Result<Vec<ExportJobLog>, ExportError> {
        let timer = QueryTimer::new("recent_export_job_logs");
        let result = sqlx::query_as::<_, ExportJobLogEntity>(
            r#"
            SELECT id, job_id, level, message, created_at
            FROM export_job_logs
            WHERE job_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result?.into_iter().map(ExportJobLog::try_from).collect()
    }

    async fn fail_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<String>, ExportError> {
        let timer = QueryTimer::new("fail_stale_export_jobs");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE export_jobs
            SET status = 'failed', stage = 'failed', error_message = $2,
                updated_at = NOW(), completed_at = NOW()
            WHERE status = 'processing' AND updated_at < $1
            RETURNING job_id
            "#,
        )
        .bind(cutoff)
        .bind(message)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }
}
