//! Export job state machine driver.

use std::sync::Arc;

use super::collaborators::ExportJobStore;
use crate::errors::ExportError;
use crate::models::{ExportStage, JobLogLevel, JobTransition, StoredArtifact};

/// Tracks one job execution and persists each transition.
///
/// Transitions the stage machine does not allow are rejected before anything
/// is written, so a job cannot leave a terminal stage or move backwards.
pub struct ExportJobTracker {
    store: Arc<dyn ExportJobStore>,
    job_id: String,
    stage: ExportStage,
    progress: i32,
}

impl ExportJobTracker {
    /// Starts tracking a freshly created job.
    pub fn new(store: Arc<dyn ExportJobStore>, job_id: impl Into<String>) -> Self {
        Self {
            store,
            job_id: job_id.into(),
            stage: ExportStage::Pending,
            progress: 0,
        }
    }

    pub fn stage(&self) -> ExportStage {
        self.stage
    }

    pub fn progress(&self) -> i32 {
        self.progress
    }

    pub async fn advance(&mut self, next: ExportStage) -> Result<(), ExportError> {
        if next.is_terminal() {
            return Err(ExportError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        self.apply(JobTransition::Advance(next)).await
    }

    pub async fn complete(&mut self, artifact: StoredArtifact) -> Result<(), ExportError> {
        self.apply(JobTransition::Complete(artifact)).await
    }

    pub async fn fail(&mut self, message: impl Into<String>) -> Result<(), ExportError> {
        self.apply(JobTransition::Fail(message.into())).await
    }

    async fn apply(&mut self, transition: JobTransition) -> Result<(), ExportError> {
        let next = transition.stage();
        if !self.stage.can_transition_to(next) {
            return Err(ExportError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }

        let applied = self.store.apply_transition(&self.job_id, &transition).await?;
        if !applied {
            return Err(ExportError::Store(format!(
                "Job {} is no longer processing",
                self.job_id
            )));
        }

        self.stage = next;
        if let Some(progress) = next.progress() {
            self.progress = progress;
        }

        tracing::info!(
            job_id = %self.job_id,
            stage = %self.stage,
            progress = self.progress,
            "Export job transitioned"
        );
        Ok(())
    }

    /// Appends a job log line. Failures are logged and swallowed.
    pub async fn log(&self, level: JobLogLevel, message: &str) {
        if let Err(e) = self.store.append_log(&self.job_id, level, message).await {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to write job log line");
        }
    }
}
