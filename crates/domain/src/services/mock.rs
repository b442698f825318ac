//! In-memory collaborators for development and testing.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::collaborators::{
    ArtifactStorage, DecisionSource, ExportJobStore, PdfRenderError, PdfRenderer, ProjectAccess,
    StorageError,
};
use crate::errors::ExportError;
use crate::models::{
    ApprovalRecord, Attachment, BrandingProfile, CommentRecord, Decision, DecisionOption,
    ExportJob, ExportJobLog, ExportJobStatus, ExportStage, JobLogLevel, JobTransition,
    NewExportJob, Project, UserProfile,
};

#[derive(Debug, Default)]
struct RepositoryState {
    projects: HashMap<Uuid, Project>,
    members: HashSet<(Uuid, Uuid)>,
    decisions: Vec<Decision>,
    deleted: HashSet<Uuid>,
    options: Vec<DecisionOption>,
    comments: Vec<CommentRecord>,
    approvals: Vec<ApprovalRecord>,
    attachments: Vec<Attachment>,
    profiles: HashMap<Uuid, Option<String>>,
    branding: HashMap<Uuid, BrandingProfile>,
    jobs: HashMap<String, ExportJob>,
    logs: HashMap<String, Vec<ExportJobLog>>,
    progress_history: HashMap<String, Vec<i32>>,
    fail_child_fetches: bool,
    hide_decisions: bool,
}

/// In-memory project, decision and job store.
///
/// Mirrors the guards the SQL repositories apply: transitions are ignored once
/// a job is terminal or when they would lower its progress.
#[derive(Debug, Default)]
pub struct MockExportRepository {
    state: Mutex<RepositoryState>,
}

impl MockExportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepositoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_project(&self, project: Project) {
        self.lock().projects.insert(project.id, project);
    }

    pub fn add_member(&self, workspace_id: Uuid, user_id: Uuid) {
        self.lock().members.insert((workspace_id, user_id));
    }

    pub fn add_decision(&self, decision: Decision) {
        self.lock().decisions.push(decision);
    }

    pub fn delete_decision(&self, decision_id: Uuid) {
        self.lock().deleted.insert(decision_id);
    }

    pub fn add_option(&self, option: DecisionOption) {
        self.lock().options.push(option);
    }

    pub fn add_comment(&self, comment: CommentRecord) {
        self.lock().comments.push(comment);
    }

    pub fn add_approval(&self, approval: ApprovalRecord) {
        self.lock().approvals.push(approval);
    }

    pub fn add_attachment(&self, attachment: Attachment) {
        self.lock().attachments.push(attachment);
    }

    pub fn add_profile(&self, user_id: Uuid, display_name: Option<&str>) {
        self.lock()
            .profiles
            .insert(user_id, display_name.map(str::to_string));
    }

    pub fn add_branding_profile(&self, profile: BrandingProfile) {
        self.lock().branding.insert(profile.id, profile);
    }

    /// Makes every child-row fetch fail with a store error.
    pub fn fail_child_fetches(&self) {
        self.lock().fail_child_fetches = true;
    }

    /// Makes `fetch_decisions` return nothing while ids are still listed, as
    /// when decisions are deleted after a job is recorded.
    pub fn hide_decisions_from_fetch(&self) {
        self.lock().hide_decisions = true;
    }

    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn jobs(&self) -> Vec<ExportJob> {
        self.lock().jobs.values().cloned().collect()
    }

    /// Every progress value persisted for the job, in write order.
    pub fn progress_history(&self, job_id: &str) -> Vec<i32> {
        self.lock()
            .progress_history
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Backdates a job's `updated_at`, for reconciliation tests.
    pub fn set_updated_at(&self, job_id: &str, updated_at: DateTime<Utc>) {
        if let Some(job) = self.lock().jobs.get_mut(job_id) {
            job.updated_at = updated_at;
        }
    }

    fn check_child_fetch(state: &RepositoryState) -> Result<(), ExportError> {
        if state.fail_child_fetches {
            return Err(ExportError::Store("Simulated fetch failure".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProjectAccess for MockExportRepository {
    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, ExportError> {
        Ok(self.lock().projects.get(&project_id).cloned())
    }

    async fn is_active_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ExportError> {
        Ok(self.lock().members.contains(&(workspace_id, user_id)))
    }
}

#[async_trait::async_trait]
impl DecisionSource for MockExportRepository {
    async fn list_active_decision_ids(
        &self,
        project_id: Uuid,
        requested: Option<&[Uuid]>,
    ) -> Result<Vec<Uuid>, ExportError> {
        let state = self.lock();
        Ok(state
            .decisions
            .iter()
            .filter(|d| d.project_id == project_id && !state.deleted.contains(&d.id))
            .filter(|d| requested.map_or(true, |ids| ids.contains(&d.id)))
            .map(|d| d.id)
            .collect())
    }

    async fn fetch_decisions(&self, decision_ids: &[Uuid]) -> Result<Vec<Decision>, ExportError> {
        let state = self.lock();
        if state.hide_decisions {
            return Ok(Vec::new());
        }
        Ok(state
            .decisions
            .iter()
            .filter(|d| decision_ids.contains(&d.id) && !state.deleted.contains(&d.id))
            .cloned()
            .collect())
    }

    async fn fetch_options(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<DecisionOption>, ExportError> {
        let state = self.lock();
        Self::check_child_fetch(&state)?;
        Ok(state
            .options
            .iter()
            .filter(|o| decision_ids.contains(&o.decision_id))
            .cloned()
            .collect())
    }

    async fn fetch_comments(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<CommentRecord>, ExportError> {
        let state = self.lock();
        Self::check_child_fetch(&state)?;
        Ok(state
            .comments
            .iter()
            .filter(|c| decision_ids.contains(&c.decision_id))
            .cloned()
            .collect())
    }

    async fn fetch_approvals(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<ApprovalRecord>, ExportError> {
        let state = self.lock();
        Self::check_child_fetch(&state)?;
        Ok(state
            .approvals
            .iter()
            .filter(|a| decision_ids.contains(&a.decision_id))
            .cloned()
            .collect())
    }

    async fn fetch_attachments(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<Attachment>, ExportError> {
        let state = self.lock();
        Self::check_child_fetch(&state)?;
        Ok(state
            .attachments
            .iter()
            .filter(|a| decision_ids.contains(&a.decision_id))
            .cloned()
            .collect())
    }

    async fn fetch_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<UserProfile>, ExportError> {
        let state = self.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                state.profiles.get(id).map(|name| UserProfile {
                    user_id: *id,
                    display_name: name.clone(),
                })
            })
            .collect())
    }

    async fn find_branding_profile(
        &self,
        branding_profile_id: Uuid,
    ) -> Result<Option<BrandingProfile>, ExportError> {
        Ok(self.lock().branding.get(&branding_profile_id).cloned())
    }
}

#[async_trait::async_trait]
impl ExportJobStore for MockExportRepository {
    async fn create_job(&self, job: NewExportJob) -> Result<ExportJob, ExportError> {
        let now = Utc::now();
        let record = ExportJob {
            job_id: job.job_id.clone(),
            project_id: job.project_id,
            scope: job.scope,
            format: job.format,
            decision_ids: job.decision_ids,
            branding_profile_id: job.branding_profile_id,
            include_attachments: job.include_attachments,
            created_by: job.created_by,
            status: ExportJobStatus::Processing,
            stage: ExportStage::Pending,
            progress: 0,
            artifact_url: None,
            artifact_path: None,
            artifact_size: None,
            artifact_content_type: None,
            artifact_checksum: None,
            error_message: None,
            request_payload: job.request_payload,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let mut state = self.lock();
        state.progress_history.insert(job.job_id.clone(), vec![0]);
        state.jobs.insert(job.job_id, record.clone());
        Ok(record)
    }

    async fn apply_transition(
        &self,
        job_id: &str,
        transition: &JobTransition,
    ) -> Result<bool, ExportError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(job) = state.jobs.get_mut(job_id) else {
            return Ok(false);
        };
        if job.status != ExportJobStatus::Processing {
            return Ok(false);
        }

        let stage = transition.stage();
        let progress = stage.progress().unwrap_or(job.progress);
        if progress < job.progress {
            return Ok(false);
        }

        let now = Utc::now();
        job.stage = stage;
        job.status = stage.status();
        job.progress = progress;
        job.updated_at = now;
        match transition {
            JobTransition::Advance(_) => {}
            JobTransition::Complete(artifact) => {
                job.artifact_url = Some(artifact.url.clone());
                job.artifact_path = Some(artifact.path.clone());
                job.artifact_size = Some(artifact.size);
                job.artifact_content_type = Some(artifact.content_type.clone());
                job.artifact_checksum = Some(artifact.checksum.clone());
                job.completed_at = Some(now);
            }
            JobTransition::Fail(message) => {
                job.error_message = Some(message.clone());
                job.completed_at = Some(now);
            }
        }

        state
            .progress_history
            .entry(job_id.to_string())
            .or_default()
            .push(progress);
        Ok(true)
    }

    async fn append_log(
        &self,
        job_id: &str,
        level: JobLogLevel,
        message: &str,
    ) -> Result<(), ExportError> {
        self.lock()
            .logs
            .entry(job_id.to_string())
            .or_default()
            .push(ExportJobLog {
                level,
                message: message.to_string(),
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn find_job(&self, job_id: &str) -> Result<Option<ExportJob>, ExportError> {
        Ok(self.lock().jobs.get(job_id).cloned())
    }

    async fn recent_logs(&self, job_id: &str, limit: i64) -> Result<Vec<ExportJobLog>, ExportError> {
        let state = self.lock();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state
            .logs
            .get(job_id)
            .map(|logs| logs.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fail_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<String>, ExportError> {
        let mut state = self.lock();
        let now = Utc::now();
        let mut failed = Vec::new();
        for job in state.jobs.values_mut() {
            if job.status == ExportJobStatus::Processing && job.updated_at < cutoff {
                job.status = ExportJobStatus::Failed;
                job.stage = ExportStage::Failed;
                job.error_message = Some(message.to_string());
                job.updated_at = now;
                job.completed_at = Some(now);
                failed.push(job.job_id.clone());
            }
        }
        Ok(failed)
    }
}

#[derive(Debug, Default)]
struct StorageState {
    bucket_created: bool,
    objects: HashMap<String, (Vec<u8>, String)>,
}

/// In-memory object storage.
#[derive(Debug, Default)]
pub struct MockArtifactStorage {
    /// Whether uploads fail.
    pub simulate_failure: bool,
    state: Mutex<StorageState>,
}

impl MockArtifactStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose uploads always fail.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StorageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn bucket_created(&self) -> bool {
        self.lock().bucket_created
    }

    /// Stored bytes and content type at `path`.
    pub fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.lock().objects.get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }
}

#[async_trait::async_trait]
impl ArtifactStorage for MockArtifactStorage {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.lock().bucket_created = true;
        Ok(())
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.simulate_failure {
            tracing::warn!(path = %path, "Mock storage simulating upload failure");
            return Err(StorageError::Status {
                status: 500,
                message: "Simulated upload failure".to_string(),
            });
        }
        self.lock()
            .objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        if !self.lock().objects.contains_key(path) {
            return Err(StorageError::Signing(format!("Object not found: {}", path)));
        }
        Ok(format!(
            "https://storage.test/exports/{}?token=mock&expiresIn={}",
            path, ttl_secs
        ))
    }
}

/// PDF renderer that returns a fixed document or a failure.
#[derive(Debug, Clone, Default)]
pub struct MockPdfRenderer {
    pub simulate_failure: bool,
    /// Time spent in each render call.
    pub delay: Option<Duration>,
}

impl MockPdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Renderer that succeeds after `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl PdfRenderer for MockPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfRenderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.simulate_failure {
            return Err(PdfRenderError::Status(502));
        }
        tracing::debug!(html_len = html.len(), "Mock: rendering PDF");
        Ok(b"%PDF-1.4\n% mock document\n".to_vec())
    }
}
