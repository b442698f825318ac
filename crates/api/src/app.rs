use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    ArtifactStorage, DecisionSource, ExportJobStore, ExportService, ExportStatusReporter,
    PdfRenderer, ProjectAccess,
};
use persistence::repositories::{DecisionRepository, ExportJobRepository, ProjectRepository};
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, StorageBackend};
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
};
use crate::routes::{artifacts, exports, health};
use crate::services::{HttpPdfRenderer, LocalArtifactStorage, SupabaseStorage};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub exports: Arc<ExportService>,
    pub status: Arc<ExportStatusReporter>,
    /// Set when artifacts are stored on the local filesystem.
    pub local_artifacts: Option<Arc<LocalArtifactStorage>>,
}

/// The export pipeline's external dependencies.
pub struct Collaborators {
    pub projects: Arc<dyn ProjectAccess>,
    pub source: Arc<dyn DecisionSource>,
    pub jobs: Arc<dyn ExportJobStore>,
    pub storage: Arc<dyn ArtifactStorage>,
    pub pdf_renderer: Option<Arc<dyn PdfRenderer>>,
}

impl Collaborators {
    /// PostgreSQL repositories plus the configured storage backend and PDF
    /// service.
    pub fn from_config(config: &Config, pool: &PgPool) -> anyhow::Result<Self> {
        let storage: Arc<dyn ArtifactStorage> = match config.storage.backend {
            StorageBackend::Supabase => Arc::new(SupabaseStorage::from_config(&config.storage)?),
            StorageBackend::Local => Arc::new(LocalArtifactStorage::from_config(&config.storage)),
        };

        let pdf_renderer = HttpPdfRenderer::from_config(&config.pdf)?
            .map(|renderer| Arc::new(renderer) as Arc<dyn PdfRenderer>);
        if pdf_renderer.is_none() {
            tracing::warn!("No PDF service configured; PDF exports will be delivered as HTML");
        }

        Ok(Self {
            projects: Arc::new(ProjectRepository::new(pool.clone())),
            source: Arc::new(DecisionRepository::new(pool.clone())),
            jobs: Arc::new(ExportJobRepository::new(pool.clone())),
            storage,
            pdf_renderer,
        })
    }
}

impl AppState {
    pub fn new(config: Config, pool: PgPool, jwt: JwtConfig, collaborators: Collaborators) -> Self {
        let exports = ExportService::new(
            collaborators.projects.clone(),
            collaborators.source,
            collaborators.jobs.clone(),
            collaborators.storage,
        )
        .with_pdf_renderer(collaborators.pdf_renderer)
        .with_signed_url_ttl(config.storage.signed_url_ttl_secs)
        .with_pipeline_timeout(Duration::from_secs(config.export.pipeline_timeout_secs));

        let status = ExportStatusReporter::new(collaborators.projects, collaborators.jobs)
            .with_log_lines(config.export.log_lines);

        let local_artifacts = match config.storage.backend {
            StorageBackend::Local => Some(Arc::new(LocalArtifactStorage::from_config(
                &config.storage,
            ))),
            StorageBackend::Supabase => None,
        };

        Self {
            pool,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            exports: Arc::new(exports),
            status: Arc::new(status),
            local_artifacts,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Caller identity is checked by the UserAuth extractor in each handler.
    // Creation is bounded by export.pipeline_timeout_secs rather than the
    // request timeout, so the job is failed instead of abandoned.
    let create_routes = Router::new().route("/api/v1/exports", post(exports::create_export));

    let export_routes = Router::new()
        .route("/api/v1/exports/status", get(exports::get_export_status))
        .route("/api/v1/exports/:job_id", get(exports::get_export_by_id));

    // Signed links carry their own authorization.
    let artifact_routes =
        Router::new().route("/api/v1/artifacts/*path", get(artifacts::download_artifact));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let bounded_routes = Router::new()
        .merge(public_routes)
        .merge(export_routes)
        .merge(artifact_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    Router::new()
        .merge(bounded_routes)
        .merge(create_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
