//! Logging setup using tracing.
//!
//! No component holds a logger handle; everything emits through the
//! subscriber installed here, and tests may install their own capture
//! subscriber instead.

use anyhow::Result;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global tracing subscriber per the logging configuration.
///
/// Logs go to stderr so stdout stays free for results output. When a log
/// file is configured, a JSON file layer is added; the returned guard must
/// be held for the life of the process to flush it.
pub fn init(config: &crate::domain::models::LoggingConfig) -> Result<Option<WorkerGuard>> {
    let default_level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let guard = if let Some(ref file) = config.file {
        let path = Path::new(file);
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map_or_else(|| "covgen.log".to_string(), |name| name.to_string_lossy().into_owned());

        let file_appender = rolling::never(directory, file_name);
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // File layer - always JSON for structured logging
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true)
            .with_filter(env_filter.clone());

        if config.format == "json" {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(file_layer).with(stderr_layer).init();
        } else {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(file_layer).with(stderr_layer).init();
        }

        Some(guard)
    } else {
        if config.format == "json" {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(stderr_layer).init();
        } else {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(stderr_layer).init();
        }

        None
    };

    tracing::debug!(
        level = %config.level,
        format = %config.format,
        file_output = config.file.is_some(),
        "logger initialized"
    );

    Ok(guard)
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(matches!(parse_log_level("WARN"), Ok(Level::WARN)));
        assert!(parse_log_level("loud").is_err());
    }

    // init() installs a process-global subscriber, so it is exercised by
    // the binary rather than unit tests that would race each other here.
}
