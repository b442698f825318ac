//! Domain error types for the export pipeline.

use thiserror::Error;

use crate::models::ExportStage;

/// Errors raised by the export pipeline and its collaborators.
///
/// Validation errors (`InvalidRequest`, `Forbidden`, `NotFound`) are returned
/// before any job record exists. Once a job exists, `BuildFailure` and
/// `UploadFailure` are recorded on the job before being returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("Build failed: {0}")]
    BuildFailure(String),

    #[error("Invalid stored data: {0}")]
    Data(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: ExportStage, to: ExportStage },
}

impl ExportError {
    /// Wraps any error raised after job creation as a build failure,
    /// preserving upload failures.
    pub fn into_job_failure(self) -> Self {
        match self {
            ExportError::UploadFailure(_) | ExportError::BuildFailure(_) => self,
            other => ExportError::BuildFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::BuildFailure(format!("Serialization error: {}", err))
    }
}

impl From<sqlx::Error> for ExportError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ExportError::NotFound("Resource not found".into()),
            sqlx::Error::ColumnDecode { index, source } => {
                ExportError::Data(format!("Column {} could not be decoded: {}", index, source))
            }
            other => ExportError::Store(format!("Database error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_job_failure_keeps_upload_failure() {
        let err = ExportError::UploadFailure("bucket unreachable".into()).into_job_failure();
        assert!(matches!(err, ExportError::UploadFailure(msg) if msg == "bucket unreachable"));
    }

    #[test]
    fn test_into_job_failure_wraps_store_error() {
        let err = ExportError::Store("connection reset".into()).into_job_failure();
        match err {
            ExportError::BuildFailure(msg) => assert!(msg.contains("connection reset")),
            other => panic!("Expected BuildFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let err: ExportError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ExportError::NotFound(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ExportError::InvalidRequest("no decisions to export".into()).to_string(),
            "Invalid request: no decisions to export"
        );
        assert_eq!(
            ExportError::InvalidTransition {
                from: ExportStage::Completed,
                to: ExportStage::Building
            }
            .to_string(),
            "Invalid job transition from completed to building"
        );
    }
}
