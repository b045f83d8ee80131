//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$STRATA_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/strata/config.toml`
//! 3. `~/.strata/config.toml`
//!
//! # Repo Config
//!
//! Located at `<common-dir>/strata/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing: limits must be positive, the
//! abbreviation length must fit an object id, and the object format must
//! be one git knows.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::ObjectFormat;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// git_binary = "/usr/local/bin/git"
/// command_timeout_secs = 30
/// log_limit = 256
/// abbrev_len = 8
/// show_untracked = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Git executable to run (default: `git` from `PATH`)
    pub git_binary: Option<String>,

    /// Kill git invocations that run longer than this
    pub command_timeout_secs: Option<u64>,

    /// Number of commits in the snapshot's recent log
    pub log_limit: Option<usize>,

    /// Length of abbreviated commit ids
    pub abbrev_len: Option<usize>,

    /// Whether to enumerate untracked files
    pub show_untracked: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(binary) = &self.git_binary {
            if binary.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_binary cannot be empty".into(),
                ));
            }
        }
        if self.command_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "command_timeout_secs must be at least 1".into(),
            ));
        }
        validate_log_limit(self.log_limit)?;
        validate_abbrev_len(self.abbrev_len)
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// log_limit = 50
/// object_format = "sha256"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Number of commits in the snapshot's recent log
    pub log_limit: Option<usize>,

    /// Length of abbreviated commit ids
    pub abbrev_len: Option<usize>,

    /// Whether to enumerate untracked files
    pub show_untracked: Option<bool>,

    /// Override the object format detected from `extensions.objectFormat`
    pub object_format: Option<String>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_log_limit(self.log_limit)?;
        validate_abbrev_len(self.abbrev_len)?;
        self.parsed_object_format()?;
        Ok(())
    }

    /// The configured object format, if any.
    pub fn parsed_object_format(&self) -> Result<Option<ObjectFormat>, ConfigError> {
        self.object_format
            .as_deref()
            .map(|name| {
                ObjectFormat::from_name(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
            })
            .transpose()
    }
}

fn validate_log_limit(limit: Option<usize>) -> Result<(), ConfigError> {
    if limit == Some(0) {
        return Err(ConfigError::InvalidValue(
            "log_limit must be at least 1".into(),
        ));
    }
    Ok(())
}

fn validate_abbrev_len(len: Option<usize>) -> Result<(), ConfigError> {
    match len {
        Some(n) if !(4..=64).contains(&n) => Err(ConfigError::InvalidValue(format!(
            "abbrev_len must be between 4 and 64, got {n}"
        ))),
        _ => Ok(()),
    }
}
