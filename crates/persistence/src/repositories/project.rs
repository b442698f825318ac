//! Project and workspace membership repository.

use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::ExportError;
use domain::models::Project;
use domain::services::ProjectAccess;

use crate::entities::ProjectEntity;
use crate::metrics::QueryTimer;

/// Repository for project lookups and membership checks.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Creates a new ProjectRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find project by ID.
    pub async fn find_by_id(&self, project_id: Uuid) -> Result<Option<ProjectEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_project_by_id");
        let result = sqlx::query_as::<_, ProjectEntity>(
            r#"
            SELECT id, workspace_id, name
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Whether the user has an active membership in the workspace.
    pub async fn is_active_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("is_active_workspace_member");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM workspace_members
                WHERE workspace_id = $1 AND user_id = $2 AND status = 'active'
            )
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl ProjectAccess for ProjectRepository {
    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, ExportError> {
        Ok(self.find_by_id(project_id).await?.map(Project::from))
    }

    async fn is_active_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ExportError> {
        Ok(ProjectRepository::is_active_member(self, workspace_id, user_id).await?)
    }
}
