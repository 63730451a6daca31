//! Configuration structures for the covgen agent.

use serde::{Deserialize, Serialize};

/// Main configuration structure for covgen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Model client configuration.
    #[serde(default)]
    pub model: ModelConfig,

    /// Generation loop configuration.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Retry policy for model API calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Model client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Model identifier to request.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (can also be set via ANTHROPIC_API_KEY env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for the API (for testing/proxies).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API version header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Max tokens the model may generate per request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Generation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Target coverage percentage (1-100).
    #[serde(default = "default_desired_coverage")]
    pub desired_coverage: u32,

    /// Maximum number of generation rounds.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Upper bound on candidates validated per round.
    #[serde(default = "default_max_tests_per_round")]
    pub max_tests_per_round: usize,

    /// When set, a candidate whose run lowers the observed coverage is
    /// rejected even though its exit status was zero.
    #[serde(default)]
    pub require_coverage_increase: bool,

    /// Exit non-zero when the iteration budget runs out below target.
    #[serde(default)]
    pub strict_coverage: bool,
}

const fn default_desired_coverage() -> u32 {
    90
}

const fn default_max_iterations() -> u32 {
    10
}

const fn default_max_tests_per_round() -> usize {
    4
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            desired_coverage: default_desired_coverage(),
            max_iterations: default_max_iterations(),
            max_tests_per_round: default_max_tests_per_round(),
            require_coverage_increase: false,
            strict_coverage: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file; logs also go to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format(), file: None }
    }
}

/// Retry policy configuration for the model client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
