//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid desired_coverage: {0}. Must be between 1 and 100")]
    InvalidDesiredCoverage(u32),

    #[error("Invalid max_tests_per_round: {0}. Must be between 1 and 10")]
    InvalidMaxTestsPerRound(usize),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Model base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("Model id cannot be empty")]
    EmptyModel,

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .covgen/config.yaml (project config)
    /// 3. .covgen/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`COVGEN_`* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".covgen/config.yaml"))
            .merge(Yaml::file(".covgen/local.yaml"))
            .merge(Env::prefixed("COVGEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("COVGEN_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.generation.desired_coverage == 0 || config.generation.desired_coverage > 100 {
            return Err(ConfigError::InvalidDesiredCoverage(
                config.generation.desired_coverage,
            ));
        }

        if config.generation.max_tests_per_round == 0 || config.generation.max_tests_per_round > 10
        {
            return Err(ConfigError::InvalidMaxTestsPerRound(
                config.generation.max_tests_per_round,
            ));
        }

        if config.model.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(config.model.max_tokens));
        }

        if config.model.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }

        if config.model.model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}
