//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Strata has two configuration scopes:
//! - **Global**: User-level settings (git binary, timeouts, defaults)
//! - **Repo**: Repository-level overrides (log size, object format)
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Example
//!
//! ```no_run
//! use strata::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//! println!("log limit: {}", config.log_limit());
//! println!("git: {}", config.git_binary());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::StrataPaths;
use crate::core::types::ObjectFormat;

/// Default number of commits shown in a snapshot's recent log.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Default abbreviated commit id length.
pub const DEFAULT_ABBREV_LEN: usize = 7;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
}

/// Merged configuration from all sources.
///
/// Accessor methods apply precedence rules automatically: repo config
/// overrides global config, which overrides built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or
    /// fail validation. Missing config files are not an error.
    pub fn load(repo: Option<&StrataPaths>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(Self::find_global(), repo)
    }

    /// Load configuration from an explicit global file location.
    pub fn load_with(
        global_path: Option<PathBuf>,
        repo: Option<&StrataPaths>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let global = match &global_path {
            Some(path) => Self::read_toml::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };

        let repo_path = repo
            .map(StrataPaths::repo_config_path)
            .filter(|path| path.exists());
        let repo_config = match &repo_path {
            Some(path) => Some(Self::read_toml::<RepoConfig>(path)?),
            None => None,
        };

        global.validate()?;
        if let Some(ref r) = repo_config {
            r.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo: repo_config,
                global_path,
                repo_path,
            },
        })
    }

    /// Locate the global config file, if one exists.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("STRATA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("strata/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".strata/config.toml"))
            .filter(|path| path.exists())
    }

    fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Git executable. Defaults to `git`.
    pub fn git_binary(&self) -> &str {
        self.global.git_binary.as_deref().unwrap_or("git")
    }

    /// Per-invocation timeout, if configured.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.global.command_timeout_secs.map(Duration::from_secs)
    }

    /// Recent log size. Defaults to [`DEFAULT_LOG_LIMIT`].
    pub fn log_limit(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.log_limit)
            .or(self.global.log_limit)
            .unwrap_or(DEFAULT_LOG_LIMIT)
    }

    /// Abbreviated id length. Defaults to [`DEFAULT_ABBREV_LEN`].
    pub fn abbrev_len(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.abbrev_len)
            .or(self.global.abbrev_len)
            .unwrap_or(DEFAULT_ABBREV_LEN)
    }

    /// Whether untracked files are enumerated. Defaults to `true`.
    pub fn show_untracked(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.show_untracked)
            .or(self.global.show_untracked)
            .unwrap_or(true)
    }

    /// Object format override from repo config.
    ///
    /// Validated at load time, so an unparsable value reads as `None`.
    pub fn object_format(&self) -> Option<ObjectFormat> {
        self.repo
            .as_ref()
            .and_then(|r| r.parsed_object_format().ok().flatten())
    }

    /// Path the global config was loaded from.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Path the repo config was loaded from.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}
