//! Export job orchestration.
//!
//! Validates a create-export request, records the job, then drives it through
//! aggregation, building, optional PDF conversion and upload. The caller
//! waits for the result, but the pipeline runs on its own task under a
//! timeout so every recorded job ends completed or failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;
use validator::Validate;

use super::aggregator::DataAggregator;
use super::builders::build_artifact;
use super::collaborators::{
    ArtifactStorage, DecisionSource, ExportJobStore, PdfRenderer, ProjectAccess,
};
use super::job_tracker::ExportJobTracker;
use super::pdf_policy::{ConversionOutcome, PdfConversionPolicy};
use crate::errors::ExportError;
use crate::models::export_job::{PIPELINE_TIMEOUT_SECS, SIGNED_URL_TTL_SECS};
use crate::models::{
    Branding, CreateExportRequest, CreateExportResponse, ExportFormat, ExportJob, ExportMetadata,
    ExportScope, ExportStage, JobLogLevel, NewExportJob, Project, StoredArtifact,
};

/// A create-export request after validation.
#[derive(Debug, Clone)]
struct ValidatedRequest {
    project_id: Uuid,
    scope: ExportScope,
    format: ExportFormat,
    requested_ids: Option<Vec<Uuid>>,
    branding_profile_id: Option<Uuid>,
    include_attachments: bool,
}

impl ValidatedRequest {
    fn from_request(request: &CreateExportRequest) -> Result<Self, ExportError> {
        request
            .validate()
            .map_err(|e| ExportError::InvalidRequest(e.to_string()))?;

        let project_id = request
            .project_id
            .ok_or_else(|| ExportError::InvalidRequest("projectId is required".into()))?;
        let format = request
            .format
            .as_deref()
            .ok_or_else(|| ExportError::InvalidRequest("format is required".into()))?
            .parse::<ExportFormat>()
            .map_err(ExportError::InvalidRequest)?;

        let scope = request.scope.unwrap_or_default();
        let requested_ids = match scope {
            ExportScope::Project => None,
            ExportScope::Decision => {
                let ids = request.decision_ids.clone().unwrap_or_default();
                if ids.is_empty() {
                    return Err(ExportError::InvalidRequest(
                        "decisionIds must not be empty when scope is 'decision'".into(),
                    ));
                }
                Some(ids)
            }
        };

        Ok(Self {
            project_id,
            scope,
            format,
            requested_ids,
            branding_profile_id: request.branding_profile_id,
            include_attachments: request.include_attachments.unwrap_or(true),
        })
    }
}

/// Runs export jobs end to end.
#[derive(Clone)]
pub struct ExportService {
    projects: Arc<dyn ProjectAccess>,
    source: Arc<dyn DecisionSource>,
    jobs: Arc<dyn ExportJobStore>,
    storage: Arc<dyn ArtifactStorage>,
    pdf_renderer: Option<Arc<dyn PdfRenderer>>,
    signed_url_ttl_secs: u64,
    pipeline_timeout: Duration,
}

impl ExportService {
    pub fn new(
        projects: Arc<dyn ProjectAccess>,
        source: Arc<dyn DecisionSource>,
        jobs: Arc<dyn ExportJobStore>,
        storage: Arc<dyn ArtifactStorage>,
    ) -> Self {
        Self {
            projects,
            source,
            jobs,
            storage,
            pdf_renderer: None,
            signed_url_ttl_secs: SIGNED_URL_TTL_SECS,
            pipeline_timeout: Duration::from_secs(PIPELINE_TIMEOUT_SECS),
        }
    }

    /// Sets the optional HTML-to-PDF renderer.
    pub fn with_pdf_renderer(mut self, renderer: Option<Arc<dyn PdfRenderer>>) -> Self {
        self.pdf_renderer = renderer;
        self
    }

    pub fn with_signed_url_ttl(mut self, ttl_secs: u64) -> Self {
        self.signed_url_ttl_secs = ttl_secs;
        self
    }

    /// Bounds a single pipeline run. A run that exceeds it fails the job.
    pub fn with_pipeline_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_timeout = timeout;
        self
    }

    /// Creates and runs an export for `caller`.
    ///
    /// Validation, authorization and an empty decision set are reported
    /// before any job is recorded. After that every failure is written to the
    /// job before it is returned.
    pub async fn create_export(
        &self,
        caller: Uuid,
        request: CreateExportRequest,
    ) -> Result<CreateExportResponse, ExportError> {
        let validated = ValidatedRequest::from_request(&request)?;

        let project = self
            .projects
            .find_project(validated.project_id)
            .await?
            .ok_or_else(|| ExportError::NotFound("Project not found".into()))?;

        if !self
            .projects
            .is_active_member(project.workspace_id, caller)
            .await?
        {
            return Err(ExportError::Forbidden(
                "Not a member of this project's workspace".into(),
            ));
        }

        let decision_ids = self
            .source
            .list_active_decision_ids(project.id, validated.requested_ids.as_deref())
            .await?;
        if decision_ids.is_empty() {
            return Err(ExportError::InvalidRequest("No decisions to export".into()));
        }

        let job = self
            .jobs
            .create_job(NewExportJob {
                job_id: ExportJob::generate_id(),
                project_id: project.id,
                scope: validated.scope,
                format: validated.format,
                decision_ids,
                branding_profile_id: validated.branding_profile_id,
                include_attachments: validated.include_attachments,
                created_by: caller,
                request_payload: serde_json::to_value(&request)?,
            })
            .await?;

        metrics::counter!("exports_created_total", "format" => job.format.as_str()).increment(1);
        tracing::info!(
            job_id = %job.job_id,
            project_id = %job.project_id,
            format = %job.format,
            decisions = job.decision_ids.len(),
            "Export job created"
        );

        // The pipeline runs on its own task so a dropped request cannot leave
        // the job half-processed.
        let service = self.clone();
        let job_id = job.job_id.clone();
        tokio::spawn(async move { service.drive(job, project).await })
            .await
            .map_err(|e| {
                tracing::error!(job_id = %job_id, error = %e, "Export task aborted");
                ExportError::BuildFailure("Export task aborted".into())
            })?
    }

    /// Runs the pipeline for a recorded job under the pipeline timeout and
    /// writes the outcome to the job.
    async fn drive(
        &self,
        job: ExportJob,
        project: Project,
    ) -> Result<CreateExportResponse, ExportError> {
        let started = Instant::now();
        let mut tracker = ExportJobTracker::new(self.jobs.clone(), job.job_id.clone());

        let result = tokio::time::timeout(
            self.pipeline_timeout,
            self.run_pipeline(&mut tracker, &job, &project),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ExportError::BuildFailure(format!(
                "Export timed out after {}s",
                self.pipeline_timeout.as_secs_f64()
            )))
        });

        match result {
            Ok(stored) => {
                metrics::counter!(
                    "exports_completed_total",
                    "format" => job.format.as_str(),
                    "content_type" => stored.content_type.clone()
                )
                .increment(1);
                metrics::histogram!("export_duration_seconds", "format" => job.format.as_str())
                    .record(started.elapsed().as_secs_f64());
                tracker
                    .log(
                        JobLogLevel::Info,
                        &format!("Export completed ({} bytes)", stored.size),
                    )
                    .await;

                Ok(CreateExportResponse {
                    success: true,
                    job_id: job.job_id,
                    status: ExportStage::Completed.status(),
                    progress: tracker.progress(),
                    artifact_url: Some(stored.url),
                    format: job.format,
                    content_type: Some(stored.content_type),
                    artifact_size: Some(stored.size),
                })
            }
            Err(err) => {
                let failed_stage = tracker.stage();
                let message = match &err {
                    ExportError::UploadFailure(msg)
                    | ExportError::BuildFailure(msg)
                    | ExportError::Store(msg)
                    | ExportError::Data(msg) => msg.clone(),
                    other => other.to_string(),
                };

                tracing::error!(
                    job_id = %job.job_id,
                    stage = %failed_stage,
                    error = %err,
                    "Export job failed"
                );
                metrics::counter!("exports_failed_total", "stage" => failed_stage.to_string())
                    .increment(1);

                tracker.log(JobLogLevel::Error, &message).await;
                if let Err(e) = tracker.fail(message).await {
                    tracing::error!(
                        job_id = %job.job_id,
                        error = %e,
                        "Failed to record export job failure"
                    );
                }

                Err(err.into_job_failure())
            }
        }
    }

    async fn run_pipeline(
        &self,
        tracker: &mut ExportJobTracker,
        job: &ExportJob,
        project: &Project,
    ) -> Result<StoredArtifact, ExportError> {
        tracker.advance(ExportStage::Aggregating).await?;

        let branding = self.resolve_branding(tracker, job, project).await?;
        let metadata = ExportMetadata::new(job.project_id, job.job_id.clone(), job.format);
        let dataset = DataAggregator::new(self.source.clone())
            .aggregate(metadata, &job.decision_ids, job.include_attachments)
            .await?;
        // Decisions deleted after the job was recorded.
        if dataset.decisions.is_empty() {
            return Err(ExportError::BuildFailure("No decisions to export".into()));
        }
        tracker
            .log(
                JobLogLevel::Info,
                &format!(
                    "Aggregated {} decisions, {} options, {} comments, {} approvals, {} attachments",
                    dataset.decisions.len(),
                    dataset.options.len(),
                    dataset.comments.len(),
                    dataset.approvals.len(),
                    dataset.attachments.len()
                ),
            )
            .await;

        tracker.advance(ExportStage::Building).await?;
        let mut artifact = build_artifact(job.format, &dataset, branding.as_ref())?;
        drop(dataset);

        if job.format == ExportFormat::Pdf {
            tracker.advance(ExportStage::Converting).await?;
            let (converted, outcome) =
                PdfConversionPolicy::convert(self.pdf_renderer.as_deref(), artifact).await;
            artifact = converted;

            let level = match &outcome {
                ConversionOutcome::Converted => JobLogLevel::Info,
                ConversionOutcome::NoRenderer | ConversionOutcome::Fallback(_) => {
                    metrics::counter!("export_pdf_fallback_total").increment(1);
                    tracing::warn!(
                        job_id = %job.job_id,
                        outcome = ?outcome,
                        "Storing HTML instead of PDF"
                    );
                    JobLogLevel::Warn
                }
            };
            tracker.log(level, &outcome.describe()).await;
        }

        tracker.advance(ExportStage::Uploading).await?;
        let path = artifact.kind.storage_path(job.project_id, &job.job_id);
        let content_type = artifact.kind.content_type();
        let size = artifact.len() as i64;
        let checksum = shared::crypto::sha256_hex(&artifact.bytes);

        self.storage.ensure_bucket().await?;
        self.storage
            .upload(&path, artifact.bytes, content_type)
            .await?;
        let url = self
            .storage
            .signed_url(&path, self.signed_url_ttl_secs)
            .await?;

        let stored = StoredArtifact {
            path,
            url,
            size,
            content_type: content_type.to_string(),
            checksum,
        };
        tracker.complete(stored.clone()).await?;
        Ok(stored)
    }

    /// Loads the job's branding profile. A missing profile, or one from
    /// another workspace, exports without branding.
    async fn resolve_branding(
        &self,
        tracker: &ExportJobTracker,
        job: &ExportJob,
        project: &Project,
    ) -> Result<Option<Branding>, ExportError> {
        let Some(profile_id) = job.branding_profile_id else {
            return Ok(None);
        };

        match self.source.find_branding_profile(profile_id).await? {
            Some(profile) if profile.workspace_id == project.workspace_id => {
                Ok(Some(Branding::from(&profile)))
            }
            _ => {
                tracker
                    .log(
                        JobLogLevel::Warn,
                        "Branding profile not found in this workspace; exporting without branding",
                    )
                    .await;
                Ok(None)
            }
        }
    }
}
