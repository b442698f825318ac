//! Decision log entities.
//!
//! Rows are validated into typed domain records here so nothing downstream
//! handles unchecked data.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::errors::ExportError;
use domain::models::{
    ApprovalRecord, Attachment, CommentRecord, Decision, DecisionOption, UserProfile,
};

fn require_text(table: &str, id: Uuid, column: &str, value: String) -> Result<String, ExportError> {
    if value.trim().is_empty() {
        return Err(ExportError::Data(format!(
            "{} {}: {} must not be empty",
            table, id, column
        )));
    }
    Ok(value)
}

/// Database row for a decision.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionEntity {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DecisionEntity> for Decision {
    type Error = ExportError;

    fn try_from(entity: DecisionEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            project_id: entity.project_id,
            title: require_text("decisions", entity.id, "title", entity.title)?,
            description: entity.description,
            status: require_text("decisions", entity.id, "status", entity.status)?,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            due_date: entity.due_date,
        })
    }
}

/// Database row for a decision option.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionOptionEntity {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub is_recommended: bool,
}

impl TryFrom<DecisionOptionEntity> for DecisionOption {
    type Error = ExportError;

    fn try_from(entity: DecisionOptionEntity) -> Result<Self, Self::Error> {
        if entity.position < 0 {
            return Err(ExportError::Data(format!(
                "decision_options {}: position must not be negative",
                entity.id
            )));
        }
        Ok(Self {
            id: entity.id,
            decision_id: entity.decision_id,
            title: require_text("decision_options", entity.id, "title", entity.title)?,
            description: entity.description,
            position: entity.position,
            is_recommended: entity.is_recommended,
        })
    }
}

/// Database row for a decision comment.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionCommentEntity {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl From<DecisionCommentEntity> for CommentRecord {
    fn from(entity: DecisionCommentEntity) -> Self {
        Self {
            id: entity.id,
            decision_id: entity.decision_id,
            author_id: entity.author_id,
            content: entity.content,
            created_at: entity.created_at,
            edited_at: entity.edited_at,
        }
    }
}

/// Database row for a decision approval.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionApprovalEntity {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub approver_id: Option<Uuid>,
    pub role: String,
    pub status: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DecisionApprovalEntity> for ApprovalRecord {
    type Error = ExportError;

    fn try_from(entity: DecisionApprovalEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            decision_id: entity.decision_id,
            approver_id: entity.approver_id,
            role: require_text("decision_approvals", entity.id, "role", entity.role)?,
            status: require_text("decision_approvals", entity.id, "status", entity.status)?,
            created_at: entity.created_at,
            comment: entity.comment,
        })
    }
}

/// Database row for a decision attachment.
#[derive(Debug, Clone, FromRow)]
pub struct DecisionAttachmentEntity {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub filename: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub version: i32,
}

impl TryFrom<DecisionAttachmentEntity> for Attachment {
    type Error = ExportError;

    fn try_from(entity: DecisionAttachmentEntity) -> Result<Self, Self::Error> {
        if entity.version < 1 {
            return Err(ExportError::Data(format!(
                "decision_attachments {}: version must be at least 1",
                entity.id
            )));
        }
        Ok(Self {
            id: entity.id,
            decision_id: entity.decision_id,
            filename: require_text("decision_attachments", entity.id, "filename", entity.filename)?,
            url: require_text("decision_attachments", entity.id, "url", entity.url)?,
            mime_type: entity.mime_type,
            version: entity.version,
        })
    }
}

/// Database row for a user profile.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileEntity {
    pub id: Uuid,
    pub display_name: Option<String>,
}

impl From<ProfileEntity> for UserProfile {
    fn from(entity: ProfileEntity) -> Self {
        Self {
            user_id: entity.id,
            display_name: entity.display_name.filter(|name| !name.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(position: i32) -> DecisionOptionEntity {
        DecisionOptionEntity {
            id: Uuid::new_v4(),
            decision_id: Uuid::new_v4(),
            title: "Option A".to_string(),
            description: None,
            position,
            is_recommended: false,
        }
    }

    #[test]
    fn test_option_negative_position_rejected() {
        assert!(DecisionOption::try_from(option(0)).is_ok());
        let err = DecisionOption::try_from(option(-1)).unwrap_err();
        assert!(matches!(err, ExportError::Data(msg) if msg.contains("position")));
    }

    #[test]
    fn test_attachment_version_must_be_positive() {
        let entity = DecisionAttachmentEntity {
            id: Uuid::new_v4(),
            decision_id: Uuid::new_v4(),
            filename: "brief.pdf".to_string(),
            url: "https://files.test/brief.pdf".to_string(),
            mime_type: None,
            version: 0,
        };
        assert!(matches!(
            Attachment::try_from(entity),
            Err(ExportError::Data(_))
        ));
    }

    #[test]
    fn test_decision_requires_title() {
        let now = Utc::now();
        let entity = DecisionEntity {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "   ".to_string(),
            description: None,
            status: "pending".to_string(),
            due_date: None,
            created_at: now,
            updated_at: now,
        };
        assert!(Decision::try_from(entity).is_err());
    }

    #[test]
    fn test_blank_display_name_is_none() {
        let profile = UserProfile::from(ProfileEntity {
            id: Uuid::new_v4(),
            display_name: Some(String::new()),
        });
        assert!(profile.display_name.is_none());
    }
}
