use crate::error::{AudienceError, AudienceResult};
use serde::Deserialize;

/// Root application configuration. Loaded from an optional
/// `audience-studio.toml` and environment variables with the prefix
/// `AUDIENCE_STUDIO__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Which segment backend the service talks to.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process fake with seeded users and events.
    #[default]
    Memory,
    /// Hosted relational backend reached over its REST interface.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-attempt timeout for backend calls.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts after the first one fails with a retryable error.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

// Default functions
fn default_node_id() -> String {
    "audience-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_backend_url() -> String {
    "http://localhost:54321/rest/v1".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_retries() -> u32 {
    1
}
fn default_seed_demo_data() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: default_backend_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            seed_demo_data: default_seed_demo_data(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `audience-studio.toml` (if present) overlaid
    /// with environment variables.
    pub fn load() -> AudienceResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("audience-studio").required(false))
            .add_source(
                config::Environment::with_prefix("AUDIENCE_STUDIO")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AudienceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every backend call fail.
    pub fn validate(&self) -> AudienceResult<()> {
        if self.backend.timeout_ms == 0 {
            return Err(AudienceError::Config(
                "backend.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
