//! Export job domain models.
//!
//! An export job is one request to render a project's decision log into a
//! downloadable artifact. Jobs move through [`ExportStage`] in one direction
//! only and terminate exactly once.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Version string embedded in every export's metadata.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Lifetime of a signed artifact URL in seconds (1 hour).
pub const SIGNED_URL_TTL_SECS: u64 = 3600;

/// Default upper bound on one export pipeline run in seconds.
pub const PIPELINE_TIMEOUT_SECS: u64 = 110;

/// Maximum number of log lines returned by the status endpoint.
pub const MAX_STATUS_LOG_LINES: i64 = 10;

/// Maximum number of decision ids accepted in one request.
pub const MAX_DECISIONS_PER_EXPORT: usize = 1000;

/// Requested artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    Csv,
    Json,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Pdf => "PDF",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CSV" => Ok(ExportFormat::Csv),
            "JSON" => Ok(ExportFormat::Json),
            "PDF" => Ok(ExportFormat::Pdf),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which decisions an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    /// Every non-deleted decision in the project.
    #[default]
    Project,
    /// An explicit subset of decisions.
    Decision,
}

impl FromStr for ExportScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(ExportScope::Project),
            "decision" => Ok(ExportScope::Decision),
            _ => Err(format!("Unknown export scope: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportScope::Project => write!(f, "project"),
            ExportScope::Decision => write!(f, "decision"),
        }
    }
}

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportJobStatus {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for ExportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportJobStatus::Processing => write!(f, "processing"),
            ExportJobStatus::Completed => write!(f, "completed"),
            ExportJobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ExportJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(ExportJobStatus::Processing),
            "completed" => Ok(ExportJobStatus::Completed),
            "failed" => Ok(ExportJobStatus::Failed),
            _ => Err(format!("Unknown export job status: {}", s)),
        }
    }
}

/// Pipeline stage of an export job.
///
/// `Pending -> Aggregating -> Building -> [Converting] -> Uploading -> Completed`,
/// with `Failed` reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Pending,
    Aggregating,
    Building,
    Converting,
    Uploading,
    Completed,
    Failed,
}

impl ExportStage {
    /// Progress percentage recorded when the stage is entered.
    ///
    /// `Failed` keeps whatever progress the job had reached.
    pub fn progress(&self) -> Option<i32> {
        match self {
            ExportStage::Pending => Some(0),
            ExportStage::Aggregating => Some(10),
            ExportStage::Building => Some(30),
            ExportStage::Converting => Some(60),
            ExportStage::Uploading => Some(85),
            ExportStage::Completed => Some(100),
            ExportStage::Failed => None,
        }
    }

    /// Status projected from the stage.
    pub fn status(&self) -> ExportJobStatus {
        match self {
            ExportStage::Completed => ExportJobStatus::Completed,
            ExportStage::Failed => ExportJobStatus::Failed,
            _ => ExportJobStatus::Processing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStage::Completed | ExportStage::Failed)
    }

    fn ordinal(&self) -> u8 {
        match self {
            ExportStage::Pending => 0,
            ExportStage::Aggregating => 1,
            ExportStage::Building => 2,
            ExportStage::Converting => 3,
            ExportStage::Uploading => 4,
            ExportStage::Completed => 5,
            ExportStage::Failed => 6,
        }
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: ExportStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            ExportStage::Failed => true,
            ExportStage::Completed => *self == ExportStage::Uploading,
            // Forward skips are allowed: non-PDF jobs never enter Converting.
            _ => next.ordinal() > self.ordinal(),
        }
    }
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportStage::Pending => "pending",
            ExportStage::Aggregating => "aggregating",
            ExportStage::Building => "building",
            ExportStage::Converting => "converting",
            ExportStage::Uploading => "uploading",
            ExportStage::Completed => "completed",
            ExportStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for ExportStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExportStage::Pending),
            "aggregating" => Ok(ExportStage::Aggregating),
            "building" => Ok(ExportStage::Building),
            "converting" => Ok(ExportStage::Converting),
            "uploading" => Ok(ExportStage::Uploading),
            "completed" => Ok(ExportStage::Completed),
            "failed" => Ok(ExportStage::Failed),
            _ => Err(format!("Unknown export stage: {}", s)),
        }
    }
}

/// Final content type of a persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Csv,
    Json,
    Html,
    Pdf,
}

impl ArtifactKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Csv => "text/csv; charset=utf-8",
            ArtifactKind::Json => "application/json",
            ArtifactKind::Html => "text/html; charset=utf-8",
            ArtifactKind::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Csv => "csv",
            ArtifactKind::Json => "json",
            ArtifactKind::Html => "html",
            ArtifactKind::Pdf => "pdf",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(ArtifactKind::Csv),
            "json" => Some(ArtifactKind::Json),
            "html" => Some(ArtifactKind::Html),
            "pdf" => Some(ArtifactKind::Pdf),
            _ => None,
        }
    }

    /// Storage key for a job's artifact: `{project_id}/{job_id}.{ext}`.
    pub fn storage_path(&self, project_id: Uuid, job_id: &str) -> String {
        format!("{}/{}.{}", project_id, job_id, self.extension())
    }
}

/// Serialized artifact bytes plus their kind.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Location and fingerprint of an uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub path: String,
    pub url: String,
    pub size: i64,
    pub content_type: String,
    pub checksum: String,
}

/// One state-transition event for a job.
#[derive(Debug, Clone)]
pub enum JobTransition {
    /// Enter a non-terminal stage.
    Advance(ExportStage),
    /// Terminate successfully with the stored artifact.
    Complete(StoredArtifact),
    /// Terminate with an error message.
    Fail(String),
}

impl JobTransition {
    pub fn stage(&self) -> ExportStage {
        match self {
            JobTransition::Advance(stage) => *stage,
            JobTransition::Complete(_) => ExportStage::Completed,
            JobTransition::Fail(_) => ExportStage::Failed,
        }
    }
}

/// Export job domain model.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub job_id: String,
    pub project_id: Uuid,
    pub scope: ExportScope,
    pub format: ExportFormat,
    pub decision_ids: Vec<Uuid>,
    pub branding_profile_id: Option<Uuid>,
    pub include_attachments: bool,
    pub created_by: Uuid,
    pub status: ExportJobStatus,
    pub stage: ExportStage,
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

impl ExportJob {
    /// Generate a unique job ID (`export_<random>`).
    pub fn generate_id() -> String {
        let random_bytes: [u8; 12] = rand::thread_rng().gen();
        format!("export_{}", URL_SAFE_NO_PAD.encode(random_bytes))
    }
}

/// Input for creating a job record.
#[derive(Debug, Clone)]
pub struct NewExportJob {
    pub job_id: String,
    pub project_id: Uuid,
    pub scope: ExportScope,
    pub format: ExportFormat,
    pub decision_ids: Vec<Uuid>,
    pub branding_profile_id: Option<Uuid>,
    pub include_attachments: bool,
    pub created_by: Uuid,
    pub request_payload: JsonValue,
}

/// Severity of a job log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobLogLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for JobLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobLogLevel::Info => write!(f, "info"),
            JobLogLevel::Warn => write!(f, "warn"),
            JobLogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for JobLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(JobLogLevel::Info),
            "warn" | "warning" => Ok(JobLogLevel::Warn),
            "error" => Ok(JobLogLevel::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// A diagnostic line associated with a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobLog {
    pub level: JobLogLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an export.
///
/// Fields are optional at the wire level so that missing values surface as
/// `InvalidRequest` rather than a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportRequest {
    pub project_id: Option<Uuid>,
    pub scope: Option<ExportScope>,
    #[validate(length(max = 1000, message = "At most 1000 decisions can be exported at once"))]
    pub decision_ids: Option<Vec<Uuid>>,
    pub format: Option<String>,
    pub branding_profile_id: Option<Uuid>,
    /// Accepted for compatibility; not used by the builders.
    pub include_signatures: Option<bool>,
    pub include_attachments: Option<bool>,
}

/// Successful create-export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportResponse {
    pub success: bool,
    pub job_id: String,
    pub status: ExportJobStatus,
    pub progress: i32,
    pub artifact_url: Option<String>,
    pub format: ExportFormat,
    pub content_type: Option<String>,
    pub artifact_size: Option<i64>,
}

/// Query parameters for the status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatusQuery {
    pub job_id: Option<String>,
}

/// Export job status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatusResponse {
    pub job_id: String,
    pub status: ExportJobStatus,
    pub stage: ExportStage,
    pub progress: i32,
    pub format: ExportFormat,
    pub artifact_url: Option<String>,
    pub artifact_size: Option<i64>,
    pub content_type: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: Vec<ExportJobLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!(ExportFormat::from_str("csv").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_str("JSON").unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::from_str(" Pdf ").unwrap(), ExportFormat::Pdf);
        assert!(ExportFormat::from_str("xlsx").is_err());
    }

    #[test]
    fn test_export_format_serde_uppercase() {
        assert_eq!(serde_json::to_string(&ExportFormat::Pdf).unwrap(), "\"PDF\"");
        let parsed: ExportFormat = serde_json::from_str("\"CSV\"").unwrap();
        assert_eq!(parsed, ExportFormat::Csv);
    }

    #[test]
    fn test_scope_default_is_project() {
        assert_eq!(ExportScope::default(), ExportScope::Project);
        assert_eq!(ExportScope::from_str("Decision").unwrap(), ExportScope::Decision);
    }

    #[test]
    fn test_stage_progress_is_monotonic_along_happy_path() {
        let path = [
            ExportStage::Pending,
            ExportStage::Aggregating,
            ExportStage::Building,
            ExportStage::Converting,
            ExportStage::Uploading,
            ExportStage::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            assert!(pair[0].progress() < pair[1].progress());
        }
    }

    #[test]
    fn test_converting_is_optional() {
        assert!(ExportStage::Building.can_transition_to(ExportStage::Uploading));
    }

    #[test]
    fn test_completed_only_after_uploading() {
        assert!(!ExportStage::Building.can_transition_to(ExportStage::Completed));
        assert!(!ExportStage::Pending.can_transition_to(ExportStage::Completed));
    }

    #[test]
    fn test_no_backwards_or_repeated_transitions() {
        assert!(!ExportStage::Building.can_transition_to(ExportStage::Aggregating));
        assert!(!ExportStage::Building.can_transition_to(ExportStage::Building));
    }

    #[test]
    fn test_terminal_stages_never_transition() {
        for next in [
            ExportStage::Pending,
            ExportStage::Aggregating,
            ExportStage::Uploading,
            ExportStage::Completed,
            ExportStage::Failed,
        ] {
            assert!(!ExportStage::Completed.can_transition_to(next));
            assert!(!ExportStage::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_any_running_stage_can_fail() {
        for stage in [
            ExportStage::Pending,
            ExportStage::Aggregating,
            ExportStage::Building,
            ExportStage::Converting,
            ExportStage::Uploading,
        ] {
            assert!(stage.can_transition_to(ExportStage::Failed));
            assert_eq!(stage.status(), ExportJobStatus::Processing);
        }
    }

    #[test]
    fn test_stage_round_trips_through_display() {
        for stage in [ExportStage::Converting, ExportStage::Failed] {
            assert_eq!(ExportStage::from_str(&stage.to_string()).unwrap(), stage);
        }
    }

    #[test]
    fn test_artifact_kind_storage_path() {
        let project_id = Uuid::nil();
        assert_eq!(
            ArtifactKind::Html.storage_path(project_id, "export_abc"),
            "00000000-0000-0000-0000-000000000000/export_abc.html"
        );
        assert_eq!(ArtifactKind::Pdf.content_type(), "application/pdf");
    }

    #[test]
    fn test_artifact_kind_from_extension() {
        assert_eq!(ArtifactKind::from_extension("CSV"), Some(ArtifactKind::Csv));
        assert_eq!(ArtifactKind::from_extension("pdf"), Some(ArtifactKind::Pdf));
        assert_eq!(ArtifactKind::from_extension("exe"), None);
    }

    #[test]
    fn test_generate_job_id() {
        let job_id = ExportJob::generate_id();
        assert!(job_id.starts_with("export_"));
        assert!(job_id.len() > 10);
        assert_ne!(job_id, ExportJob::generate_id());
    }

    #[test]
    fn test_create_request_deserializes_camel_case() {
        let request: CreateExportRequest = serde_json::from_value(serde_json::json!({
            "projectId": "6f1c2c1e-3d7b-4d39-9a7e-8a1d3f2b9c10",
            "scope": "decision",
            "decisionIds": ["0b6f7a9e-1c2d-4e5f-8a9b-0c1d2e3f4a5b"],
            "format": "pdf",
            "includeAttachments": false
        }))
        .unwrap();

        assert_eq!(request.scope, Some(ExportScope::Decision));
        assert_eq!(request.decision_ids.as_ref().map(Vec::len), Some(1));
        assert_eq!(request.include_attachments, Some(false));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_too_many_decisions() {
        let request = CreateExportRequest {
            decision_ids: Some(vec![Uuid::nil(); MAX_DECISIONS_PER_EXPORT + 1]),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
