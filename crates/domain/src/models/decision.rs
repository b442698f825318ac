//! Decision log records.
//!
//! Typed rows for decisions and their related entities. The persistence layer
//! validates raw rows into these records before anything downstream sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project owned by a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
}

/// A decision awaiting or having received approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
}

/// One of the options considered for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOption {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_recommended: bool,
}

/// Comment row as stored, before author name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Approval row as stored, before approver name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub approver_id: Option<Uuid>,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// A file attached to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub filename: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub version: i32,
}

/// Display name of a user, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
}
