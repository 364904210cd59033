//! Configuration types for tunefetch

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Acquisition tool configuration (scratch space and yt-dlp invocation)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AcquisitionConfig {
    /// Parent directory for per-job scratch directories (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Audio format passed to `--audio-format` (default: "mp3")
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Audio quality passed to `--audio-quality` (default: "128K")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            yt_dlp_path: None,
            search_path: true,
            audio_format: default_audio_format(),
            audio_quality: default_audio_quality(),
        }
    }
}

/// Object storage backend
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Objects written to a directory on disk
    Local {
        /// Root directory for stored objects (default: "./storage")
        #[serde(default = "default_storage_root")]
        root: PathBuf,

        /// Base URL objects are served from (default: `file://` URLs under `root`)
        #[serde(default)]
        public_base_url: Option<String>,
    },

    /// S3-compatible HTTP endpoint accepting `PUT <endpoint>/<bucket>/<key>`
    Http {
        /// Endpoint base URL
        endpoint: String,

        /// Bucket name
        bucket: String,

        /// Optional bearer token sent with each upload
        #[serde(default)]
        auth_token: Option<String>,

        /// Base URL objects are served from (default: `https://<bucket>.s3.amazonaws.com`)
        #[serde(default)]
        public_base_url: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            root: default_storage_root(),
            public_base_url: None,
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./tunefetch.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Task lifecycle configuration (listing, concurrency, timeouts, reconciliation)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskConfig {
    /// Number of tasks returned by the recent-tasks listing (default: 10)
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,

    /// Maximum concurrently running acquisition jobs (None = unbounded)
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,

    /// Time budget of a single acquisition job (default: 900s)
    #[serde(default = "default_job_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub job_timeout: Duration,

    /// Age after which a non-terminal task is considered abandoned (default: 1800s)
    #[serde(default = "default_stale_after", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub stale_after: Duration,

    /// How often the staleness sweeper runs (default: 60s)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            max_concurrent_jobs: None,
            job_timeout: default_job_timeout(),
            stale_after: default_stale_after(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:3900)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Largest accepted audio upload body in bytes (default: 50 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Caller identity resolution
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            max_upload_bytes: default_max_upload_bytes(),
            auth: AuthConfig::default(),
        }
    }
}

/// Caller identity configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthConfig {
    /// Header carrying the authenticated user's external id (default: "x-user-id")
    #[serde(default = "default_identity_header")]
    pub identity_header: String,

    /// Shared secret required in `X-Api-Key` alongside the identity header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Secret enabling test-mode identities (test mode is disabled when None)
    #[serde(default)]
    pub test_mode_secret: Option<String>,

    /// Secret required in `X-Webhook-Secret` by the user lifecycle webhook
    /// (the webhook is disabled when None)
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_header: default_identity_header(),
            api_key: None,
            test_mode_secret: None,
            webhook_secret: None,
        }
    }
}

/// Main configuration for [`TaskManager`](crate::TaskManager)
///
/// Fields are organized into sub-configs:
/// - [`acquisition`](AcquisitionConfig) - scratch space and the yt-dlp tool
/// - [`storage`](StorageConfig) - where audio bytes are uploaded
/// - [`persistence`](PersistenceConfig) - database location
/// - [`tasks`](TaskConfig) - listing, concurrency, timeouts and reconciliation
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Acquisition tool settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Object storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Task lifecycle settings
    #[serde(default)]
    pub tasks: TaskConfig,

    /// API settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the task lifecycle cannot operate with
    pub fn validate(&self) -> Result<()> {
        let tasks = &self.tasks;
        if tasks.recent_limit == 0 {
            return Err(config_error("must be at least 1", "tasks.recent_limit"));
        }
        if tasks.max_concurrent_jobs == Some(0) {
            return Err(config_error(
                "must be at least 1 when set",
                "tasks.max_concurrent_jobs",
            ));
        }
        if tasks.job_timeout.is_zero() {
            return Err(config_error("must be greater than zero", "tasks.job_timeout"));
        }
        if tasks.sweep_interval.is_zero() {
            return Err(config_error(
                "must be greater than zero",
                "tasks.sweep_interval",
            ));
        }
        if tasks.stale_after <= tasks.job_timeout {
            return Err(config_error(
                "must be longer than tasks.job_timeout",
                "tasks.stale_after",
            ));
        }
        if self.server.api.max_upload_bytes == 0 {
            return Err(config_error(
                "must be greater than zero",
                "server.api.max_upload_bytes",
            ));
        }
        if self.server.api.auth.identity_header.trim().is_empty() {
            return Err(config_error(
                "must not be empty",
                "server.api.auth.identity_header",
            ));
        }
        if let StorageConfig::Http {
            endpoint, bucket, ..
        } = &self.storage
        {
            crate::storage::parse_endpoint(endpoint)?;
            if bucket.trim().is_empty() {
                return Err(config_error("must not be empty", "storage.bucket"));
            }
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./tunefetch.db")
}

fn default_true() -> bool {
    true
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "128K".to_string()
}

fn default_recent_limit() -> u32 {
    10
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(900)
}

fn default_stale_after() -> Duration {
    Duration::from_secs(1800)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3900))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
