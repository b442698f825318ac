//! Fails export jobs that stopped making progress.
//!
//! The pipeline runs inside the request that created the job. If the
//! process dies mid-export the job would stay `processing` forever; this job
//! moves such jobs to `failed` so pollers get a terminal answer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::models::JobLogLevel;
use domain::services::ExportJobStore;

use super::scheduler::Job;

pub const STALE_JOB_MESSAGE: &str = "Export job timed out before completion";

pub struct StaleExportReaperJob {
    jobs: Arc<dyn ExportJobStore>,
    stale_after: Duration,
    interval: Duration,
}

impl StaleExportReaperJob {
    pub fn new(jobs: Arc<dyn ExportJobStore>, stale_after_secs: u64, interval_secs: u64) -> Self {
        Self {
            jobs,
            stale_after: Duration::from_secs(stale_after_secs),
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Fails stale jobs and returns their ids.
    pub async fn reap(&self) -> Result<Vec<String>, String> {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .map_err(|e| format!("Invalid stale job timeout: {}", e))?;
        let cutoff = Utc::now() - stale_after;

        let failed = self
            .jobs
            .fail_stale_jobs(cutoff, STALE_JOB_MESSAGE)
            .await
            .map_err(|e| e.to_string())?;

        for job_id in &failed {
            tracing::warn!(job_id = %job_id, "Failed stale export job");
            metrics::counter!("exports_failed_total", "stage" => "stale").increment(1);
            if let Err(e) = self
                .jobs
                .append_log(job_id, JobLogLevel::Error, STALE_JOB_MESSAGE)
                .await
            {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to write job log line");
            }
        }

        Ok(failed)
    }
}

#[async_trait::async_trait]
impl Job for StaleExportReaperJob {
    fn name(&self) -> &'static str {
        "stale_export_reaper"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        let failed = self.reap().await?;
        if !failed.is_empty() {
            tracing::info!(count = failed.len(), "Reaped stale export jobs");
        }
        Ok(())
    }
}
