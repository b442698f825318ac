//! Collaborator interfaces used by the export pipeline.
//!
//! The relational store, object storage and the HTML-to-PDF service are
//! external to the pipeline. Each is reached through one of these traits so
//! the orchestrator can be exercised against in-memory implementations.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::ExportError;
use crate::models::{
    ApprovalRecord, Attachment, BrandingProfile, CommentRecord, Decision, DecisionOption,
    ExportJob, ExportJobLog, JobLogLevel, JobTransition, NewExportJob, Project, UserProfile,
};

/// Project lookup and workspace membership.
#[async_trait::async_trait]
pub trait ProjectAccess: Send + Sync {
    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, ExportError>;

    /// Whether the user is an active member of the workspace.
    async fn is_active_member(&self, workspace_id: Uuid, user_id: Uuid)
        -> Result<bool, ExportError>;
}

/// Read access to decisions and their related rows.
///
/// Child fetches are keyed by a set of decision ids and return only rows
/// belonging to those decisions.
#[async_trait::async_trait]
pub trait DecisionSource: Send + Sync {
    /// Ids of non-deleted decisions in the project, optionally intersected
    /// with `requested`.
    async fn list_active_decision_ids(
        &self,
        project_id: Uuid,
        requested: Option<&[Uuid]>,
    ) -> Result<Vec<Uuid>, ExportError>;

    async fn fetch_decisions(&self, decision_ids: &[Uuid]) -> Result<Vec<Decision>, ExportError>;

    async fn fetch_options(&self, decision_ids: &[Uuid])
        -> Result<Vec<DecisionOption>, ExportError>;

    async fn fetch_comments(&self, decision_ids: &[Uuid])
        -> Result<Vec<CommentRecord>, ExportError>;

    async fn fetch_approvals(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<ApprovalRecord>, ExportError>;

    async fn fetch_attachments(&self, decision_ids: &[Uuid])
        -> Result<Vec<Attachment>, ExportError>;

    /// Profiles for the given users. Unknown ids are simply absent.
    async fn fetch_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<UserProfile>, ExportError>;

    async fn find_branding_profile(
        &self,
        branding_profile_id: Uuid,
    ) -> Result<Option<BrandingProfile>, ExportError>;
}

/// Persistence for export jobs and their log lines.
#[async_trait::async_trait]
pub trait ExportJobStore: Send + Sync {
    /// Inserts a job in `Pending` stage with progress 0.
    async fn create_job(&self, job: NewExportJob) -> Result<ExportJob, ExportError>;

    /// Persists a transition event.
    ///
    /// Returns `false` when the stored job is no longer processing or the
    /// transition would lower its progress.
    async fn apply_transition(
        &self,
        job_id: &str,
        transition: &JobTransition,
    ) -> Result<bool, ExportError>;

    async fn append_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
    ) -> Result<(), ExportError>;

    async fn find_job(&self, job_id: &str) -> Result<Option<ExportJob>, ExportError>;

    /// Newest log lines first.
    async fn recent_logs(&self, job_id: &str, limit: i64) -> Result<Vec<ExportJobLog>, ExportError>;

    /// Marks processing jobs not updated since `cutoff` as failed.
    ///
    /// Returns the ids of the jobs that were failed.
    async fn fail_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<String>, ExportError>;
}

/// Errors from the object storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Could not sign artifact URL: {0}")]
    Signing(String),
}

impl From<StorageError> for ExportError {
    fn from(err: StorageError) -> Self {
        ExportError::UploadFailure(err.to_string())
    }
}

/// Object storage for export artifacts.
#[async_trait::async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Creates the destination bucket when it does not exist yet.
    async fn ensure_bucket(&self) -> Result<(), StorageError>;

    /// Writes the object, replacing any existing object at `path`.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Mints a time-limited download URL.
    async fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, StorageError>;
}

/// Errors from the external HTML-to-PDF service.
#[derive(Debug, Error)]
pub enum PdfRenderError {
    #[error("PDF service request failed: {0}")]
    Request(String),

    #[error("PDF service returned status {0}")]
    Status(u16),

    #[error("PDF service returned an empty document")]
    EmptyDocument,
}

/// External HTML-to-PDF renderer.
#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfRenderError>;
}
