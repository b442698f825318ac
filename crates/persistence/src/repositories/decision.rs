//! Decision log repository.
//!
//! Child-row queries take the full decision id set and fetch with
//! `= ANY($1)`, one query per entity kind.

use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::ExportError;
use domain::models::{
    ApprovalRecord, Attachment, BrandingProfile, CommentRecord, Decision, DecisionOption,
    UserProfile,
};
use domain::services::DecisionSource;

use crate::entities::{
    BrandingProfileEntity, DecisionApprovalEntity, DecisionAttachmentEntity,
    DecisionCommentEntity, DecisionEntity, DecisionOptionEntity, ProfileEntity,
};
use crate::metrics::QueryTimer;

/// Repository for decisions and their related rows.
#[derive(Clone)]
pub struct DecisionRepository {
    pool: PgPool,
}

impl DecisionRepository {
    /// Creates a new DecisionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn convert_all<E, T>(rows: Vec<E>) -> Result<Vec<T>, ExportError>
where
    T: TryFrom<E, Error = ExportError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait::async_trait]
impl DecisionSource for DecisionRepository {
    async fn list_active_decision_ids(
        &self,
        project_id: Uuid,
        requested: Option<&[Uuid]>,
    ) -> Result<Vec<Uuid>, ExportError> {
        let timer = QueryTimer::new("list_active_decision_ids");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM decisions
            WHERE project_id = $1
              AND deleted_at IS NULL
              AND ($2::uuid[] IS NULL OR id = ANY($2))
            ORDER BY created_at, id
            "#,
        )
        .bind(project_id)
        .bind(requested.map(<[Uuid]>::to_vec))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }

    async fn fetch_decisions(&self, decision_ids: &[Uuid]) -> Result<Vec<Decision>, ExportError> {
        let timer = QueryTimer::new("fetch_export_decisions");
        let result = sqlx::query_as::<_, DecisionEntity>(
            r#"
            SELECT id, project_id, title, description, status, due_date, created_at, updated_at
            FROM decisions
            WHERE id = ANY($1) AND deleted_at IS NULL
            ORDER BY created_at, id
            "#,
        )
        .bind(decision_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        convert_all(result?)
    }

    async fn fetch_options(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<DecisionOption>, ExportError> {
        let timer = QueryTimer::new("fetch_export_options");
        let result = sqlx::query_as::<_, DecisionOptionEntity>(
            r#"
            SELECT id, decision_id, title, description, position, is_recommended
            FROM decision_options
            WHERE decision_id = ANY($1)
            ORDER BY decision_id, position, id
            "#,
        )
        .bind(decision_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        convert_all(result?)
    }

    async fn fetch_comments(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<CommentRecord>, ExportError> {
        let timer = QueryTimer::new("fetch_export_comments");
        let result = sqlx::query_as::<_, DecisionCommentEntity>(
            r#"
            SELECT id, decision_id, author_id, content, created_at, edited_at
            FROM decision_comments
            WHERE decision_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(decision_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(CommentRecord::from).collect())
    }

    async fn fetch_approvals(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<ApprovalRecord>, ExportError> {
        let timer = QueryTimer::new("fetch_export_approvals");
        let result = sqlx::query_as::<_, DecisionApprovalEntity>(
            r#"
            SELECT id, decision_id, approver_id, role, status, comment, created_at
            FROM decision_approvals
            WHERE decision_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(decision_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        convert_all(result?)
    }

    async fn fetch_attachments(
        &self,
        decision_ids: &[Uuid],
    ) -> Result<Vec<Attachment>, ExportError> {
        let timer = QueryTimer::new("fetch_export_attachments");
        let result = sqlx::query_as::<_, DecisionAttachmentEntity>(
            r#"
            SELECT id, decision_id, filename, url, mime_type, version
            FROM decision_attachments
            WHERE decision_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(decision_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        convert_all(result?)
    }

    async fn fetch_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<UserProfile>, ExportError> {
        let timer = QueryTimer::new("fetch_export_profiles");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT id, display_name
            FROM profiles
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(UserProfile::from).collect())
    }

    async fn find_branding_profile(
        &self,
        branding_profile_id: Uuid,
    ) -> Result<Option<BrandingProfile>, ExportError> {
        let timer = QueryTimer::new("find_branding_profile");
        let result = sqlx::query_as::<_, BrandingProfileEntity>(
            r#"
            SELECT id, workspace_id, name, logo_url, primary_color
            FROM branding_profiles
            WHERE id = $1
            "#,
        )
        .bind(branding_profile_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result?.map(BrandingProfile::try_from).transpose()
    }
}
