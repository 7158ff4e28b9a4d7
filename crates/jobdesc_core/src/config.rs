//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Collect database location, logging setup and the child write policy.
//! - Read overrides from `JOBDESC_*` environment variables.
//!
//! # Invariants
//! - Unset variables fall back to defaults; set but unparsable values are
//!   errors, never silently ignored.

use crate::logging::LogLevel;
use crate::service::jd_service::ChildWritePolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "JOBDESC_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "JOBDESC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "JOBDESC_LOG_DIR";
pub const ENV_CHILD_WRITE_POLICY: &str = "JOBDESC_CHILD_WRITE_POLICY";

const DEFAULT_DB_FILE: &str = "jobdesc.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    pub child_write_policy: ChildWritePolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_level: LogLevel::build_default(),
            log_dir: None,
            child_write_policy: ChildWritePolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, so callers and tests can supply
    /// their own source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup(ENV_DB_PATH)) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(level) = non_empty(lookup(ENV_LOG_LEVEL)) {
            config.log_level =
                LogLevel::parse(&level).ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_LOG_LEVEL,
                    value: level.clone(),
                    reason: "expected trace|debug|info|warn|error".to_string(),
                })?;
        }

        if let Some(dir) = non_empty(lookup(ENV_LOG_DIR)) {
            let path = PathBuf::from(&dir);
            if !path.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_LOG_DIR,
                    value: dir,
                    reason: "log directory must be an absolute path".to_string(),
                });
            }
            config.log_dir = Some(path);
        }

        if let Some(policy) = non_empty(lookup(ENV_CHILD_WRITE_POLICY)) {
            config.child_write_policy =
                ChildWritePolicy::parse(&policy).ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_CHILD_WRITE_POLICY,
                    value: policy.clone(),
                    reason: "expected absorb|strict".to_string(),
                })?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
