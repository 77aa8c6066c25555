//! # Configuration Module
//!
//! Server configuration, loaded from a YAML file and overridden by environment variables.
//!
//! ## Example Configuration
//!
//! ```yaml
//! repository: ./repo          # DirectoryStore root; absent = in-memory store
//! default-charset: UTF-8      # charset for textual bodies that declare none
//! slow-compile-ms: 1000       # compilations slower than this are logged at warn
//! hot-reload: true            # watch the repository and reload on change
//! context-path: /servlex      # mount point of the whole server
//! session-timeout-secs: 1800  # idle sessions expire after this
//! max-sessions: 10000         # least recently used sessions are evicted beyond this
//! log:
//!   level: info
//!   format: json
//! ```
//!
//! ## Environment Variables
//!
//! - `SERVLEX_REPOSITORY` - repository directory
//! - `SERVLEX_DEFAULT_CHARSET` - default body charset
//! - `SERVLEX_SLOW_COMPILE_MS` - slow compile threshold, decimal or `0x` hex
//! - `SERVLEX_HOT_RELOAD` - `true`/`false`
//! - `SERVLEX_CONTEXT_PATH` - server mount point
//! - `SERVLEX_SESSION_TIMEOUT_SECS` - session idle timeout
//! - `SERVLEX_MAX_SESSIONS` - session capacity
//! - `SERVLEX_LOG_*` - see [`crate::logging`]
//!
//! Values that fail to parse keep the file (or default) value.

use crate::fields::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TIMEOUT};
use crate::logging::LogConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Compilations slower than this are logged at `warn` (milliseconds).
pub const DEFAULT_SLOW_COMPILE_MS: u64 = 1000;
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerConfig {
    /// Repository directory; `None` runs on an empty in-memory store.
    pub repository: Option<PathBuf>,
    pub default_charset: String,
    pub slow_compile_ms: u64,
    pub hot_reload: bool,
    /// Path prefix the server is mounted under (empty for the root).
    pub context_path: String,
    pub session_timeout_secs: u64,
    pub max_sessions: usize,
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            repository: None,
            default_charset: DEFAULT_CHARSET.to_string(),
            slow_compile_ms: DEFAULT_SLOW_COMPILE_MS,
            hot_reload: false,
            context_path: String::new(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT.as_secs(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            log: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a configuration file. Relative repository paths are resolved against the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: ServerConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        if let (Some(repo), Some(dir)) = (&config.repository, path.parent()) {
            if repo.is_relative() {
                config.repository = Some(dir.join(repo));
            }
        }
        Ok(config)
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from the `SERVLEX_*` variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(repo) = env::var("SERVLEX_REPOSITORY") {
            if !repo.trim().is_empty() {
                self.repository = Some(PathBuf::from(repo));
            }
        }
        if let Ok(charset) = env::var("SERVLEX_DEFAULT_CHARSET") {
            if !charset.trim().is_empty() {
                self.default_charset = charset;
            }
        }
        if let Ok(val) = env::var("SERVLEX_SLOW_COMPILE_MS") {
            self.slow_compile_ms = parse_millis(&val).unwrap_or(self.slow_compile_ms);
        }
        if let Ok(val) = env::var("SERVLEX_HOT_RELOAD") {
            self.hot_reload = val.parse().unwrap_or(self.hot_reload);
        }
        if let Ok(path) = env::var("SERVLEX_CONTEXT_PATH") {
            self.context_path = path;
        }
        if let Ok(val) = env::var("SERVLEX_SESSION_TIMEOUT_SECS") {
            self.session_timeout_secs = val.trim().parse().unwrap_or(self.session_timeout_secs);
        }
        if let Ok(val) = env::var("SERVLEX_MAX_SESSIONS") {
            self.max_sessions = val.trim().parse().unwrap_or(self.max_sessions);
        }
        self.log.apply_env();
    }

    #[must_use]
    pub fn slow_compile(&self) -> Duration {
        Duration::from_millis(self.slow_compile_ms)
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

fn parse_millis(val: &str) -> Option<u64> {
    let val = val.trim();
    match val.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}
