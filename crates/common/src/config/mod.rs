//! Configuration management for the staff portal
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment in which an unset JWT secret is tolerated
pub const DEVELOPMENT_ENV: &str = "development";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Deployment environment, taken from APP_ENV when loaded
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat-completion upstream configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chat assistant behaviour
    #[serde(default)]
    pub chat: ChatConfig,

    /// Local persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// API key; when unset the offline completer answers instead
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Number of citations attached to each answer
    #[serde(default = "default_max_citations")]
    pub max_citations: usize,

    /// Idle lifetime of a chat session in minutes
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the persisted notice and contact files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Reference source fixture used for citations
    #[serde(default = "default_sources_fixture")]
    pub sources_fixture: PathBuf,

    /// Contact directory seed used when no contact file exists yet
    #[serde(default = "default_contacts_fixture")]
    pub contacts_fixture: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Staff account username
    #[serde(default = "default_staff_username")]
    pub staff_username: String,

    /// SHA-256 hex digest of the staff account password
    #[serde(default = "default_staff_password_hash")]
    pub staff_password_hash: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full env-filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name attached to logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Chat requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_environment() -> String { DEVELOPMENT_ENV.to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_llm_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_llm_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_llm_timeout() -> u64 { 30 }
fn default_max_tokens() -> u32 { 800 }
fn default_temperature() -> f32 { 0.7 }
fn default_max_citations() -> usize { 3 }
fn default_session_ttl() -> i64 { 30 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_sources_fixture() -> PathBuf { PathBuf::from("fixtures/sources.json") }
fn default_contacts_fixture() -> PathBuf { PathBuf::from("fixtures/contacts.json") }
fn default_jwt_expiration() -> u64 { 24 * 60 * 60 }
fn default_staff_username() -> String { "kca".to_string() }
// sha256("kca1234")
fn default_staff_password_hash() -> String {
    "eaa12dc4e116ca3ee733d213250c7ca063a36c5ebd81ee3e8005134c9849ca6c".to_string()
}
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "kca-portal".to_string() }
fn default_rate_limit() -> u32 { 5 }
fn default_burst() -> u32 { 10 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api_base(),
            api_key: None,
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_citations: default_max_citations(),
            session_ttl_minutes: default_session_ttl(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sources_fixture: default_sources_fixture(),
            contacts_fixture: default_contacts_fixture(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
            staff_username: default_staff_username(),
            staff_password_hash: default_staff_password_hash(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            chat: ChatConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| DEVELOPMENT_ENV.to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__LLM__API_KEY=sk-...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("environment", env.as_str())?
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT_ENV
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Whether a real chat-completion upstream is configured
    pub fn has_llm_credentials(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    /// Path of the persisted notice board
    pub fn notices_path(&self) -> PathBuf {
        self.storage.data_dir.join("notices.json")
    }

    /// Path of the persisted contact directory
    pub fn contacts_path(&self) -> PathBuf {
        self.storage.data_dir.join("contacts.json")
    }

    /// Point all storage at `dir`; used by tests and one-off tooling
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.storage.data_dir = dir.to_path_buf();
        self
    }
}
