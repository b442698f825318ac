use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    pub jwt: JwtAuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA public key in PEM format for verifying access tokens
    pub public_key: String,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

/// Where export artifacts are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Supabase-compatible Storage REST API.
    Supabase,
    /// Local filesystem with HMAC-signed download URLs.
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,

    #[serde(default)]
    pub supabase_url: String,

    #[serde(default)]
    pub service_role_key: String,

    #[serde(default = "default_local_dir")]
    pub local_dir: String,

    /// Base URL used when minting local download links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default)]
    pub signing_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    #[serde(default)]
    pub api_url: String,

    /// API key for the HTML-to-PDF service. Empty disables conversion.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_pdf_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            timeout_ms: default_pdf_timeout_ms(),
        }
    }
}

impl PdfConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Processing jobs idle for longer than this are failed by the reaper
    #[serde(default = "default_stale_job_timeout")]
    pub stale_job_timeout_secs: u64,

    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,

    /// Job log lines returned by the status endpoint
    #[serde(default = "default_log_lines")]
    pub log_lines: i64,

    /// Upper bound on one export run; expiry fails the job
    #[serde(default = "default_pipeline_timeout")]
    pub pipeline_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            stale_job_timeout_secs: default_stale_job_timeout(),
            reaper_interval_secs: default_reaper_interval(),
            log_lines: default_log_lines(),
            pipeline_timeout_secs: default_pipeline_timeout(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    120
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_jwt_leeway() -> u64 {
    30 // 30 seconds for clock skew tolerance
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Supabase
}
fn default_bucket() -> String {
    "exports".to_string()
}
fn default_signed_url_ttl() -> u64 {
    3600
}
fn default_local_dir() -> String {
    "./data/exports".to_string()
}
fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_pdf_timeout_ms() -> u64 {
    30000
}
fn default_stale_job_timeout() -> u64 {
    900
}
fn default_reaper_interval() -> u64 {
    300
}
fn default_log_lines() -> i64 {
    10
}
fn default_pipeline_timeout() -> u64 {
    110
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with DX__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("DX").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds from embedded defaults so tests do not depend on config files.
    /// Validation is skipped to allow partial configs.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 120

            [database]
            url = ""
            max_connections = 20
            min_connections = 2
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [jwt]
            public_key = "test-public-key"
            leeway_secs = 30

            [storage]
            backend = "local"
            bucket = "exports"
            signed_url_ttl_secs = 3600
            local_dir = "./data/exports"
            public_base_url = "http://localhost:8080"
            signing_secret = "test-signing-secret"

            [pdf]
            api_url = ""
            api_key = ""
            timeout_ms = 30000

            [export]
            stale_job_timeout_secs = 900
            reaper_interval_secs = 300
            log_lines = 10
            pipeline_timeout_secs = 110
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DX__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.jwt.public_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "DX__JWT__PUBLIC_KEY environment variable must be set".to_string(),
            ));
        }

        if self.storage.signed_url_ttl_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "storage.signed_url_ttl_secs must be positive".to_string(),
            ));
        }

        if self.export.pipeline_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "export.pipeline_timeout_secs must be positive".to_string(),
            ));
        }

        match self.storage.backend {
            StorageBackend::Supabase => {
                if self.storage.supabase_url.is_empty() || self.storage.service_role_key.is_empty()
                {
                    return Err(ConfigValidationError::MissingRequired(
                        "storage.supabase_url and storage.service_role_key are required for the supabase backend"
                            .to_string(),
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.signing_secret.is_empty() {
                    return Err(ConfigValidationError::MissingRequired(
                        "storage.signing_secret is required for the local backend".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }
}
