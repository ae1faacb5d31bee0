//! Runtime configuration for a substrate instance.
//!
//! # Responsibility
//! - Collect log, storage and voting-policy settings in one value.
//! - Load overrides from `CIVICDESK_*` environment variables.
//!
//! # Invariants
//! - Defaults produce an in-memory substrate with logging disabled.
//! - Path settings must be absolute when present.

use crate::logging::{default_log_level, init_logging};
use crate::model::voting::RevotePolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "CIVICDESK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CIVICDESK_LOG_DIR";
pub const ENV_DB_PATH: &str = "CIVICDESK_DB_PATH";
pub const ENV_REVOTE_POLICY: &str = "CIVICDESK_REVOTE_POLICY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Rolling log directory; logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
    /// Database file; an in-memory database is used when `None`.
    pub db_path: Option<PathBuf>,
    pub revote_policy: RevotePolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            revote_policy: RevotePolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by any `CIVICDESK_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(level) = non_empty(lookup(ENV_LOG_LEVEL)) {
            config.log_level = level;
        }
        if let Some(dir) = non_empty(lookup(ENV_LOG_DIR)) {
            config.log_dir = Some(absolute_path(ENV_LOG_DIR, dir)?);
        }
        if let Some(path) = non_empty(lookup(ENV_DB_PATH)) {
            config.db_path = Some(absolute_path(ENV_DB_PATH, path)?);
        }
        if let Some(policy) = non_empty(lookup(ENV_REVOTE_POLICY)) {
            config.revote_policy = RevotePolicy::parse(&policy).ok_or(ConfigError::Invalid {
                key: ENV_REVOTE_POLICY,
                value: policy,
            })?;
        }

        Ok(config)
    }

    /// Starts file logging when `log_dir` is configured.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(dir) = self.log_dir.as_ref() else {
            return Ok(false);
        };
        let dir = dir.to_str().ok_or(ConfigError::Invalid {
            key: ENV_LOG_DIR,
            value: dir.display().to_string(),
        })?;
        init_logging(&self.log_level, dir).map_err(ConfigError::Logging)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
        }
    }
}

impl Error for ConfigError {}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn absolute_path(key: &'static str, value: String) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(&value);
    if !path.is_absolute() {
        return Err(ConfigError::Invalid { key, value });
    }
    Ok(path)
}
