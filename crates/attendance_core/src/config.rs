//! Environment configuration.
//!
//! # Responsibility
//! - Read runtime settings from `ATTENDANCE_*` environment variables.
//! - Fall back to defaults with a log line when a variable is unset.
//!
//! # Invariants
//! - Invalid values are reported, never silently replaced by defaults.
//! - `store_timeout` is always greater than zero.

use crate::logging::default_log_level;
use crate::service::sync_client::DEFAULT_STORE_TIMEOUT;
use log::{info, warn};
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_VAR: &str = "ATTENDANCE_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "ATTENDANCE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "ATTENDANCE_LOG_DIR";
pub const STORE_TIMEOUT_VAR: &str = "ATTENDANCE_STORE_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} value `{}`: {}", self.key, self.value, self.reason)
    }
}

impl Error for ConfigError {}

/// Runtime settings for the attendance front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite file. `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub store_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through `lookup`, which maps a variable name to its
    /// value when set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = var(DB_PATH_VAR).map(PathBuf::from);
        if db_path.is_none() {
            warn!("{DB_PATH_VAR} not set, using in-memory database");
        }

        let log_level = var(LOG_LEVEL_VAR).unwrap_or_else(|| {
            info!("{LOG_LEVEL_VAR} not set, using default: {}", defaults.log_level);
            defaults.log_level.clone()
        });

        let log_dir = match var(LOG_DIR_VAR) {
            Some(value) => {
                let path = PathBuf::from(value.trim());
                if !path.is_absolute() {
                    return Err(ConfigError {
                        key: LOG_DIR_VAR,
                        value,
                        reason: "must be an absolute path".to_string(),
                    });
                }
                Some(path)
            }
            None => None,
        };

        let store_timeout = match var(STORE_TIMEOUT_VAR) {
            Some(value) => parse_timeout_ms(&value)?,
            None => {
                info!(
                    "{STORE_TIMEOUT_VAR} not set, using default: {}",
                    defaults.store_timeout.as_millis()
                );
                defaults.store_timeout
            }
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            store_timeout,
        })
    }
}

fn parse_timeout_ms(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError {
        key: STORE_TIMEOUT_VAR,
        value: value.to_string(),
        reason,
    };

    let millis: u64 = value.trim().parse().map_err(|err| invalid(format!("{err}")))?;
    if millis == 0 {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, LOG_DIR_VAR, STORE_TIMEOUT_VAR};
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ATTENDANCE_DB_PATH", "/var/lib/attendance.db"),
            ("ATTENDANCE_LOG_LEVEL", "warn"),
            ("ATTENDANCE_LOG_DIR", "/var/log/attendance"),
            ("ATTENDANCE_STORE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(
            config.db_path.as_deref(),
            Some(std::path::Path::new("/var/lib/attendance.db"))
        );
        assert_eq!(config.log_level, "warn");
        assert_eq!(
            config.log_dir.as_deref(),
            Some(std::path::Path::new("/var/log/attendance"))
        );
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_zero_and_garbage_timeouts() {
        let zero = AppConfig::from_lookup(lookup(&[(STORE_TIMEOUT_VAR, "0")])).unwrap_err();
        assert!(zero.reason.contains("greater than zero"));

        let garbage = AppConfig::from_lookup(lookup(&[(STORE_TIMEOUT_VAR, "soon")])).unwrap_err();
        assert_eq!(garbage.key, STORE_TIMEOUT_VAR);
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = AppConfig::from_lookup(lookup(&[(LOG_DIR_VAR, "logs")])).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }
}
