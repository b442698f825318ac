//! Repository tests against a real PostgreSQL database.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -p persistence`.
//! Each test is skipped when the variable is unset.

use chrono::{Duration, Utc};
use domain::models::{
    ExportFormat, ExportJobStatus, ExportScope, ExportStage, JobLogLevel, JobTransition,
    NewExportJob, StoredArtifact,
};
use domain::services::{DecisionSource, ExportJobStore, ProjectAccess};
use persistence::db::{create_pool, run_migrations, DatabaseConfig};
use persistence::repositories::{DecisionRepository, ExportJobRepository, ProjectRepository};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&DatabaseConfig {
        url,
        max_connections: 5,
        min_connections: 1,
        connect_timeout_secs: 10,
        idle_timeout_secs: 60,
    })
    .await
    .expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Some(pool)
}

struct Seeded {
    project_id: Uuid,
    workspace_id: Uuid,
    member: Uuid,
    live: Uuid,
    deleted: Uuid,
}

async fn seed(pool: &PgPool) -> Seeded {
    let workspace_id: Uuid =
        sqlx::query_scalar("INSERT INTO workspaces (name) VALUES ('Test') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let project_id: Uuid = sqlx::query_scalar(
        "INSERT INTO projects (workspace_id, name) VALUES ($1, 'Launch') RETURNING id",
    )
    .bind(workspace_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let member = Uuid::new_v4();
    sqlx::query("INSERT INTO workspace_members (workspace_id, user_id) VALUES ($1, $2)")
        .bind(workspace_id)
        .bind(member)
        .execute(pool)
        .await
        .unwrap();

    let live: Uuid = sqlx::query_scalar(
        "INSERT INTO decisions (project_id, title) VALUES ($1, 'Keep') RETURNING id",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let deleted: Uuid = sqlx::query_scalar(
        "INSERT INTO decisions (project_id, title, deleted_at) VALUES ($1, 'Gone', NOW()) RETURNING id",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await
    .unwrap();

    Seeded {
        project_id,
        workspace_id,
        member,
        live,
        deleted,
    }
}

fn new_job(seeded: &Seeded) -> NewExportJob {
    NewExportJob {
        job_id: format!("export_test_{}", Uuid::new_v4().simple()),
        project_id: seeded.project_id,
        scope: ExportScope::Project,
        format: ExportFormat::Csv,
        decision_ids: vec![seeded.live],
        branding_profile_id: None,
        include_attachments: true,
        created_by: seeded.member,
        request_payload: serde_json::json!({ "format": "CSV" }),
    }
}

#[tokio::test]
async fn test_project_membership() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let repo = ProjectRepository::new(pool.clone());

    let project = ProjectAccess::find_project(&repo, seeded.project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.workspace_id, seeded.workspace_id);
    assert!(ProjectAccess::is_active_member(&repo, seeded.workspace_id, seeded.member)
        .await
        .unwrap());
    assert!(!ProjectAccess::is_active_member(&repo, seeded.workspace_id, Uuid::new_v4())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_deleted_decisions_are_excluded() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let repo = DecisionRepository::new(pool.clone());

    let all = repo
        .list_active_decision_ids(seeded.project_id, None)
        .await
        .unwrap();
    assert_eq!(all, vec![seeded.live]);

    let requested = repo
        .list_active_decision_ids(seeded.project_id, Some(&[seeded.deleted, seeded.live]))
        .await
        .unwrap();
    assert_eq!(requested, vec![seeded.live]);
}

#[tokio::test]
async fn test_job_lifecycle() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let repo = ExportJobRepository::new(pool.clone());

    let job = repo.create_job(new_job(&seeded)).await.unwrap();
    assert_eq!(job.stage, ExportStage::Pending);
    assert_eq!(job.progress, 0);

    assert!(repo
        .apply_transition(&job.job_id, &JobTransition::Advance(ExportStage::Building))
        .await
        .unwrap());
    // Progress never moves backwards.
    assert!(!repo
        .apply_transition(&job.job_id, &JobTransition::Advance(ExportStage::Aggregating))
        .await
        .unwrap());

    // Completion is only accepted from the upload stage.
    assert!(repo
        .apply_transition(&job.job_id, &JobTransition::Advance(ExportStage::Uploading))
        .await
        .unwrap());

    let artifact = StoredArtifact {
        path: format!("{}/{}.csv", seeded.project_id, job.job_id),
        url: "https://storage.test/signed".to_string(),
        size: 42,
        content_type: "text/csv; charset=utf-8".to_string(),
        checksum: "ab".repeat(32),
    };
    assert!(repo
        .apply_transition(&job.job_id, &JobTransition::Complete(artifact))
        .await
        .unwrap());
    // Terminal jobs ignore further transitions.
    assert!(!repo
        .apply_transition(&job.job_id, &JobTransition::Fail("late".into()))
        .await
        .unwrap());

    let stored = repo.find_job(&job.job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExportJobStatus::Completed);
    assert_eq!(stored.progress, 100);
    assert_eq!(stored.artifact_size, Some(42));
    assert!(stored.completed_at.is_some());
    assert!(stored.error_message.is_none());
}

#[tokio::test]
async fn test_recent_logs_newest_first() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let repo = ExportJobRepository::new(pool.clone());
    let job = repo.create_job(new_job(&seeded)).await.unwrap();

    for i in 0..3 {
        repo.append_log(&job.job_id, JobLogLevel::Info, &format!("step {}", i))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let logs = repo.recent_logs(&job.job_id, 2).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].message, "step 2");
    assert_eq!(logs[1].message, "step 1");
}

#[tokio::test]
async fn test_fail_stale_jobs() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let seeded = seed(&pool).await;
    let repo = ExportJobRepository::new(pool.clone());
    let stale = repo.create_job(new_job(&seeded)).await.unwrap();
    let fresh = repo.create_job(new_job(&seeded)).await.unwrap();

    sqlx::query("UPDATE export_jobs SET updated_at = NOW() - INTERVAL '1 hour' WHERE job_id = $1")
        .bind(&stale.job_id)
        .execute(&pool)
        .await
        .unwrap();

    let failed = repo
        .fail_stale_jobs(Utc::now() - Duration::minutes(15), "timed out")
        .await
        .unwrap();
    assert!(failed.contains(&stale.job_id));
    assert!(!failed.contains(&fresh.job_id));

    let stored = repo.find_job(&stale.job_id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExportJobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("timed out"));
}
