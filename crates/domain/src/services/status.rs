//! Read-only export status queries.

use std::sync::Arc;

use uuid::Uuid;

use super::collaborators::{ExportJobStore, ProjectAccess};
use crate::errors::ExportError;
use crate::models::export_job::MAX_STATUS_LOG_LINES;
use crate::models::ExportStatusResponse;

/// Projects the latest persisted state of a job.
pub struct ExportStatusReporter {
    projects: Arc<dyn ProjectAccess>,
    jobs: Arc<dyn ExportJobStore>,
    log_lines: i64,
}

impl ExportStatusReporter {
    pub fn new(projects: Arc<dyn ProjectAccess>, jobs: Arc<dyn ExportJobStore>) -> Self {
        Self {
            projects,
            jobs,
            log_lines: MAX_STATUS_LOG_LINES,
        }
    }

    /// Caps the number of log lines returned, never above the default.
    pub fn with_log_lines(mut self, log_lines: i64) -> Self {
        self.log_lines = log_lines.clamp(0, MAX_STATUS_LOG_LINES);
        self
    }

    /// Returns the status of `job_id` for `caller`.
    ///
    /// The caller must be an active member of the workspace owning the job's
    /// project. Log lines are best-effort and newest first.
    pub async fn get_status(
        &self,
        caller: Uuid,
        job_id: Option<&str>,
    ) -> Result<ExportStatusResponse, ExportError> {
        let job_id = job_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExportError::InvalidRequest("jobId is required".into()))?;

        let job = self
            .jobs
            .find_job(job_id)
            .await?
            .ok_or_else(|| ExportError::NotFound("Export job not found".into()))?;

        let project = self
            .projects
            .find_project(job.project_id)
            .await?
            .ok_or_else(|| ExportError::NotFound("Export job not found".into()))?;
        if !self
            .projects
            .is_active_member(project.workspace_id, caller)
            .await?
        {
            return Err(ExportError::Forbidden(
                "Not a member of this project's workspace".into(),
            ));
        }

        let logs = match self.jobs.recent_logs(&job.job_id, self.log_lines).await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::warn!(job_id = %job.job_id, error = %e, "Failed to load job logs");
                Vec::new()
            }
        };

        Ok(ExportStatusResponse {
            job_id: job.job_id,
            status: job.status,
            stage: job.stage,
            progress: job.progress,
            format: job.format,
            artifact_url: job.artifact_url,
            artifact_size: job.artifact_size,
            content_type: job.artifact_content_type,
            error_message: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExportFormat, ExportJobStatus, ExportScope, ExportStage, JobLogLevel, JobTransition,
        NewExportJob, Project,
    };
    use crate::services::mock::MockExportRepository;

    async fn setup() -> (Arc<MockExportRepository>, ExportStatusReporter, Uuid) {
        let repo = Arc::new(MockExportRepository::new());
        let project = Project {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            name: "Rebrand".to_string(),
        };
        let member = Uuid::new_v4();
        repo.add_project(project.clone());
        repo.add_member(project.workspace_id, member);
        repo.create_job(NewExportJob {
            job_id: "export_status".to_string(),
            project_id: project.id,
            scope: ExportScope::Project,
            format: ExportFormat::Csv,
            decision_ids: vec![Uuid::new_v4()],
            branding_profile_id: None,
            include_attachments: true,
            created_by: member,
            request_payload: serde_json::json!({}),
        })
        .await
        .unwrap();

        let reporter = ExportStatusReporter::new(repo.clone(), repo.clone());
        (repo, reporter, member)
    }

    #[tokio::test]
    async fn test_reflects_in_flight_progress() {
        let (repo, reporter, member) = setup().await;
        repo.apply_transition("export_status", &JobTransition::Advance(ExportStage::Building))
            .await
            .unwrap();

        let status = reporter.get_status(member, Some("export_status")).await.unwrap();
        assert_eq!(status.status, ExportJobStatus::Processing);
        assert_eq!(status.stage, ExportStage::Building);
        assert_eq!(status.progress, 30);
        assert!(status.artifact_url.is_none());
        assert!(status.logs.is_empty());
    }

    #[tokio::test]
    async fn test_failed_job_reports_error() {
        let (repo, reporter, member) = setup().await;
        repo.apply_transition("export_status", &JobTransition::Fail("upload refused".into()))
            .await
            .unwrap();

        let status = reporter.get_status(member, Some("export_status")).await.unwrap();
        assert_eq!(status.status, ExportJobStatus::Failed);
        assert_eq!(status.error_message.as_deref(), Some("upload refused"));
        assert!(status.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_logs_capped_and_newest_first() {
        let (repo, reporter, member) = setup().await;
        for i in 0..15 {
            repo.append_log("export_status", JobLogLevel::Info, &format!("step {}", i))
                .await
                .unwrap();
        }

        let status = reporter.get_status(member, Some("export_status")).await.unwrap();
        assert_eq!(status.logs.len(), 10);
        assert_eq!(status.logs[0].message, "step 14");
        assert_eq!(status.logs[9].message, "step 5");
    }

    #[tokio::test]
    async fn test_log_lines_clamped() {
        let (repo, _, member) = setup().await;
        for i in 0..15 {
            repo.append_log("export_status", JobLogLevel::Info, &format!("step {}", i))
                .await
                .unwrap();
        }
        let reporter = ExportStatusReporter::new(repo.clone(), repo.clone()).with_log_lines(3);
        let status = reporter.get_status(member, Some("export_status")).await.unwrap();
        assert_eq!(status.logs.len(), 3);

        let reporter = ExportStatusReporter::new(repo.clone(), repo.clone()).with_log_lines(50);
        let status = reporter.get_status(member, Some("export_status")).await.unwrap();
        assert_eq!(status.logs.len(), 10);
    }

    #[tokio::test]
    async fn test_missing_job_id_is_invalid() {
        let (_, reporter, member) = setup().await;
        for job_id in [None, Some(""), Some("   ")] {
            let err = reporter.get_status(member, job_id).await.unwrap_err();
            assert!(matches!(err, ExportError::InvalidRequest(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_job_not_found() {
        let (_, reporter, member) = setup().await;
        let err = reporter
            .get_status(member, Some("export_missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_member_forbidden() {
        let (_, reporter, _) = setup().await;
        let err = reporter
            .get_status(Uuid::new_v4(), Some("export_status"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Forbidden(_)));
    }
}
