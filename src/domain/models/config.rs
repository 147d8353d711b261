use serde::{Deserialize, Serialize};

use super::attempt::DEFAULT_PASS_THRESHOLD;
use super::challenge::{builtin_challenges, Challenge};

/// Main configuration structure for Promptcraft
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Challenge catalog, in play order
    #[serde(default = "builtin_challenges")]
    pub catalog: Vec<Challenge>,

    /// Scoring oracle configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Image generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Composite image configuration
    #[serde(default)]
    pub compositor: CompositorConfig,

    /// Durable storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: builtin_challenges(),
            scoring: ScoringConfig::default(),
            generation: GenerationConfig::default(),
            compositor: CompositorConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Scoring oracle (Claude Messages API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Base URL of the Messages API
    #[serde(default = "default_scoring_base_url")]
    pub base_url: String,

    /// Model used for grading
    #[serde(default = "default_scoring_model")]
    pub model: String,

    /// API key; falls back to `ANTHROPIC_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum tokens for the grading response
    #[serde(default = "default_scoring_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,

    /// Scoring requests per second
    #[serde(default = "default_scoring_requests_per_second")]
    pub requests_per_second: f64,

    /// Minimum similarity score (0-100) that counts as a pass
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
}

fn default_scoring_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_scoring_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

const fn default_scoring_max_tokens() -> u32 {
    1024
}

const fn default_request_timeout_secs() -> u64 {
    120
}

const fn default_scoring_requests_per_second() -> f64 {
    2.0
}

const fn default_pass_threshold() -> f64 {
    DEFAULT_PASS_THRESHOLD
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: default_scoring_base_url(),
            model: default_scoring_model(),
            api_key: None,
            max_tokens: default_scoring_max_tokens(),
            timeout_secs: default_request_timeout_secs(),
            requests_per_second: default_scoring_requests_per_second(),
            pass_threshold: default_pass_threshold(),
        }
    }
}

/// Image generation (OpenAI-compatible images API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Base URL of the images API
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Image model
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Requested image size, e.g. `1024x1024`
    #[serde(default = "default_generation_size")]
    pub size: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient generation failures
    #[serde(default = "default_generation_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "dall-e-3".to_string()
}

fn default_generation_size() -> String {
    "1024x1024".to_string()
}

const fn default_generation_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            api_key: None,
            size: default_generation_size(),
            timeout_secs: default_request_timeout_secs(),
            max_retries: default_generation_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Encoding of the composite image sent for scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeFormat {
    Jpeg,
    Png,
}

impl CompositeFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl Default for CompositeFormat {
    fn default() -> Self {
        Self::Jpeg
    }
}

/// Composite image configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompositorConfig {
    /// Output encoding
    #[serde(default)]
    pub format: CompositeFormat,

    /// JPEG quality, 1-100
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Largest allowed canvas side in pixels
    #[serde(default = "default_max_canvas_dimension")]
    pub max_canvas_dimension: u32,
}

const fn default_jpeg_quality() -> u8 {
    85
}

const fn default_max_canvas_dimension() -> u32 {
    8192
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            format: CompositeFormat::default(),
            jpeg_quality: default_jpeg_quality(),
            max_canvas_dimension: default_max_canvas_dimension(),
        }
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_storage_path() -> String {
    ".promptcraft/promptcraft.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
