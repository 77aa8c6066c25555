//! Structured logging initialization.
//!
//! Servlex logs through `tracing`. Request handling opens a span carrying the request id,
//! the context root and the servlet, and the pipeline logs component compilation, cleanup
//! and errors as structured events. This module installs the subscriber:
//!
//! - `json` format for production (one JSON object per line, with the current span)
//! - `pretty` format for development
//!
//! ## Environment Variables
//!
//! - `SERVLEX_LOG_LEVEL` - trace/debug/info/warn/error (default `info`)
//! - `SERVLEX_LOG_FORMAT` - json/pretty (default `json`)
//! - `SERVLEX_LOG_FILTER` - extra comma-separated directives, e.g. `servlex::cache=debug`
//! - `SERVLEX_LOG_LOCATION` - include file and line (default `false`)
//!
//! `RUST_LOG`, when set, takes precedence over the level.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub level: String,
    pub format: LogFormat,
    /// Module filter (comma-separated directives)
    pub filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from the `SERVLEX_LOG_*` variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(level) = env::var("SERVLEX_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("SERVLEX_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Ok(filter) = env::var("SERVLEX_LOG_FILTER") {
            self.filter = Some(filter);
        }
        if let Some(location) = env::var("SERVLEX_LOG_LOCATION")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.include_location = location;
        }
    }

    /// Create a default configuration for development
    pub fn default_dev() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            filter: None,
            include_location: true,
        }
    }

    /// The configured level, `INFO` when unrecognized.
    pub fn tracing_level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.tracing_level().as_str()));
        if let Some(filter) = &self.filter {
            for directive in filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
                }
            }
        }
        env_filter
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Json);
    }

    #[test]
    fn test_level_fallback() {
        let mut config = LogConfig::default();
        assert_eq!(config.tracing_level(), Level::INFO);
        config.level = "WARN".into();
        assert_eq!(config.tracing_level(), Level::WARN);
        config.level = "loud".into();
        assert_eq!(config.tracing_level(), Level::INFO);
    }

    #[test]
    fn test_log_config_from_yaml() {
        let config: LogConfig =
            serde_yaml::from_str("level: debug\nformat: pretty\nfilter: servlex::cache=trace\n")
                .unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter.as_deref(), Some("servlex::cache=trace"));
        assert!(!config.include_location);
        assert_eq!(LogConfig::default_dev().format, LogFormat::Pretty);
    }
}
