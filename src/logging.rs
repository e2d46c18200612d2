//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a
//! JSON or pretty formatter, optionally behind a non-blocking writer.
//! Settings come from the `settings.logging` section of the configuration
//! file and are overridden by:
//!
//! - `TAGROUTE_LOG_LEVEL`: trace/debug/info/warn/error
//! - `TAGROUTE_LOG_FORMAT`: json/pretty
//! - `TAGROUTE_LOG_ASYNC`: true/false
//! - `TAGROUTE_LOG_TARGET_FILTER`: extra comma separated directives
//! - `TAGROUTE_LOG_INCLUDE_LOCATION`: true/false
//!
//! `RUST_LOG`, when set, replaces the level entirely.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingSettings;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a background thread
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Values from the configuration file, then environment overrides.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self::from_file(settings).with_env_overrides()
    }

    fn from_file(settings: &LoggingSettings) -> Self {
        let defaults = Self::default();
        Self {
            log_level: settings.level.clone().unwrap_or(defaults.log_level),
            format: settings
                .format
                .as_deref()
                .map_or(defaults.format, LogFormat::parse),
            async_logging: settings.async_writer.unwrap_or(defaults.async_logging),
            target_filter: settings.target_filter.clone(),
            include_location: settings.include_location.unwrap_or(defaults.include_location),
        }
    }

    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = env::var("TAGROUTE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(format) = env::var("TAGROUTE_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Some(flag) = env_flag("TAGROUTE_LOG_ASYNC") {
            self.async_logging = flag;
        }
        if let Ok(filter) = env::var("TAGROUTE_LOG_TARGET_FILTER") {
            self.target_filter = Some(filter);
        }
        if let Some(flag) = env_flag("TAGROUTE_LOG_INCLUDE_LOCATION") {
            self.include_location = flag;
        }
        self
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Install the global subscriber.
///
/// With `async_logging` the returned guard flushes pending lines when
/// dropped; keep it alive for the lifetime of the process.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));

    if let Some(target_filter) = &config.target_filter {
        for filter in target_filter.split(',') {
            let filter = filter.trim();
            if filter.is_empty() {
                continue;
            }
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
            }
        }
    }

    let (writer, guard) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("other"), LogFormat::Pretty);
    }

    #[test]
    fn settings_fill_the_config() {
        let settings = LoggingSettings {
            level: Some("debug".to_string()),
            format: Some("json".to_string()),
            include_location: Some(true),
            ..LoggingSettings::default()
        };
        let config = LogConfig::from_file(&settings);
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_location);
        assert!(!config.async_logging);
    }

    #[test]
    fn unknown_level_is_info() {
        let config = LogConfig {
            log_level: "loud".to_string(),
            ..LogConfig::default()
        };
        assert_eq!(config.level(), Level::INFO);
    }
}
