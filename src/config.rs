//! Configuration management for vivado-shell.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::session::SessionTimeouts;

/// Upper bound for every configured timeout: one week.
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

fn capped_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.min(MAX_TIMEOUT_SECS))
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit Vivado version directory. Overrides detection.
    pub vivado_path: Option<PathBuf>,
    /// Release to pick among detected installations (e.g. `2023.2`).
    pub vivado_version: Option<String>,
    /// Extra roots probed for installations.
    pub additional_search_paths: Vec<PathBuf>,
    /// Session timing.
    pub session: SessionSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Session timing section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Seconds to wait for the TCL prompt after launch.
    pub startup_timeout_secs: u64,
    /// Default per-command timeout in seconds.
    pub command_timeout_secs: u64,
    /// Seconds to wait for a graceful `exit` before killing.
    pub shutdown_timeout_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            startup_timeout_secs: 60,
            command_timeout_secs: 300,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Config file names probed when no explicit file is given, in order.
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        locations.push(cwd.join("vivado-mcp.json"));
        locations.push(cwd.join(".vivado-mcp.json"));
    }
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".config").join("vivado-mcp").join("config.json"));
        locations.push(home.join(".vivado-mcp.json"));
    }
    locations
}

/// Split a search path list on `;` if present, otherwise on `:`.
pub fn split_search_paths(value: &str) -> Vec<PathBuf> {
    let separator = if value.contains(';') { ';' } else { ':' };
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Load the first readable and valid file among `locations`.
    ///
    /// Unparseable or unreadable candidates are skipped.
    pub fn from_first_existing(locations: &[PathBuf]) -> Option<Self> {
        locations
            .iter()
            .filter(|loc| loc.is_file())
            .find_map(|loc| Self::from_file(loc).ok())
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Search paths from the environment are appended to those from the file.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(path) = non_empty("VIVADO_PATH") {
            self.vivado_path = Some(PathBuf::from(path));
        }

        if let Some(version) = non_empty("VIVADO_VERSION") {
            self.vivado_version = Some(version);
        }

        if let Some(paths) = non_empty("VIVADO_SEARCH_PATHS") {
            self.additional_search_paths
                .extend(split_search_paths(&paths));
        }

        if let Some(level) = non_empty("VIVADO_SHELL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = non_empty("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref path) = args.vivado_path {
            self.vivado_path = Some(path.clone());
        }

        if let Some(ref version) = args.vivado_version {
            self.vivado_version = Some(version.clone());
        }

        if let Some(secs) = args.timeout_secs {
            self.session.command_timeout_secs = secs;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::from_first_existing(&default_config_locations()).unwrap_or_default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Session timing derived from this configuration.
    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            startup: capped_secs(self.session.startup_timeout_secs),
            shutdown: capped_secs(self.session.shutdown_timeout_secs),
            ..SessionTimeouts::default()
        }
    }

    /// Default command timeout, capped at [`MAX_TIMEOUT_SECS`].
    pub fn command_timeout(&self) -> Duration {
        capped_secs(self.session.command_timeout_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
