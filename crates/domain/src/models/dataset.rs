//! Normalized export dataset.
//!
//! Assembled fresh by the aggregator for a single job and consumed by exactly
//! one builder. Every child row references a decision present in `decisions`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::decision::{Attachment, Decision, DecisionOption};
use super::export_job::{ExportFormat, EXPORT_FORMAT_VERSION};

/// Comment with its author's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportComment {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Approval with its approver's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportApproval {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub approver_name: Option<String>,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Export metadata embedded in every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub project_id: Uuid,
    pub job_id: String,
    pub format: ExportFormat,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportMetadata {
    pub fn new(project_id: Uuid, job_id: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            project_id,
            job_id: job_id.into(),
            format,
            exported_at: Utc::now(),
            version: EXPORT_FORMAT_VERSION.to_string(),
        }
    }
}

/// Decisions and their related rows for one export.
#[derive(Debug, Clone)]
pub struct ExportDataset {
    pub metadata: ExportMetadata,
    pub decisions: Vec<Decision>,
    pub options: Vec<DecisionOption>,
    pub comments: Vec<ExportComment>,
    pub approvals: Vec<ExportApproval>,
    pub attachments: Vec<Attachment>,
}

/// A decision with borrowed references to its related rows, in dataset order.
#[derive(Debug)]
pub struct DecisionBundle<'a> {
    pub decision: &'a Decision,
    pub options: Vec<&'a DecisionOption>,
    pub comments: Vec<&'a ExportComment>,
    pub approvals: Vec<&'a ExportApproval>,
    pub attachments: Vec<&'a Attachment>,
}

impl DecisionBundle<'_> {
    /// Number of rows the decision occupies in a positional zip.
    pub fn row_count(&self) -> usize {
        self.options
            .len()
            .max(self.comments.len())
            .max(self.approvals.len())
            .max(self.attachments.len())
            .max(1)
    }
}

impl ExportDataset {
    pub fn new(metadata: ExportMetadata) -> Self {
        Self {
            metadata,
            decisions: Vec::new(),
            options: Vec::new(),
            comments: Vec::new(),
            approvals: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Groups child rows under their decisions, keeping decision order.
    pub fn bundles(&self) -> Vec<DecisionBundle<'_>> {
        self.decisions
            .iter()
            .map(|decision| DecisionBundle {
                decision,
                options: self
                    .options
                    .iter()
                    .filter(|o| o.decision_id == decision.id)
                    .collect(),
                comments: self
                    .comments
                    .iter()
                    .filter(|c| c.decision_id == decision.id)
                    .collect(),
                approvals: self
                    .approvals
                    .iter()
                    .filter(|a| a.decision_id == decision.id)
                    .collect(),
                attachments: self
                    .attachments
                    .iter()
                    .filter(|a| a.decision_id == decision.id)
                    .collect(),
            })
            .collect()
    }

    /// Whether every child row references a decision in the dataset.
    pub fn is_closed(&self) -> bool {
        let has = |id: &Uuid| self.decisions.iter().any(|d| &d.id == id);
        self.options.iter().all(|o| has(&o.decision_id))
            && self.comments.iter().all(|c| has(&c.decision_id))
            && self.approvals.iter().all(|a| has(&a.decision_id))
            && self.attachments.iter().all(|a| has(&a.decision_id))
    }
}
