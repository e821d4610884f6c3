//! Process configuration for board hosts.
//!
//! # Responsibility
//! - Load an optional TOML file into [`KanbanConfig`].
//! - Apply `KANBAN_*` environment overrides on top of file values.
//!
//! # Invariants
//! - Missing keys fall back to defaults; a missing file is not an error.
//! - Invalid numeric overrides are ignored and reported back to the caller,
//!   never fatal. This module does not log; it runs before logging is up.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "KANBAN_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "KANBAN_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "KANBAN_LOG_DIR";
pub const ENV_CONNECT_ATTEMPTS: &str = "KANBAN_CONNECT_ATTEMPTS";
pub const ENV_CONNECT_BACKOFF_MS: &str = "KANBAN_CONNECT_BACKOFF_MS";
pub const ENV_ACTOR: &str = "KANBAN_ACTOR";

const DEFAULT_DB_PATH: &str = "kanban.db";
const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_CONNECT_BACKOFF_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KanbanConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    /// Startup connect attempts before giving up.
    pub connect_attempts: u32,
    /// Fixed sleep between connect attempts.
    pub connect_backoff_ms: u64,
    /// Recorded in `created_by`/`updated_by`.
    pub actor: Option<String>,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_backoff_ms: DEFAULT_CONNECT_BACKOFF_MS,
            actor: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Environment override whose value could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredOverride {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl Display for IgnoredOverride {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "key={} value={:?} reason={}", self.key, self.value, self.reason)
    }
}

impl KanbanConfig {
    /// Loads `path` (when given and present), then applies env overrides.
    ///
    /// Returns the config with the overrides that were skipped, so the caller
    /// can report them once logging is initialized.
    pub fn load(path: Option<&Path>) -> Result<(Self, Vec<IgnoredOverride>), ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        let ignored = config.apply_env_overrides();
        Ok((config, ignored))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env_overrides(&mut self) -> Vec<IgnoredOverride> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<IgnoredOverride> {
        let mut ignored = Vec::new();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        if let Some(path) = value(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = value(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = value(ENV_CONNECT_ATTEMPTS) {
            match raw.parse::<u32>() {
                Ok(attempts) => self.connect_attempts = attempts,
                Err(err) => ignored.push(IgnoredOverride {
                    key: ENV_CONNECT_ATTEMPTS,
                    value: raw,
                    reason: err.to_string(),
                }),
            }
        }
        if let Some(raw) = value(ENV_CONNECT_BACKOFF_MS) {
            match raw.parse::<u64>() {
                Ok(backoff) => self.connect_backoff_ms = backoff,
                Err(err) => ignored.push(IgnoredOverride {
                    key: ENV_CONNECT_BACKOFF_MS,
                    value: raw,
                    reason: err.to_string(),
                }),
            }
        }
        if let Some(actor) = value(ENV_ACTOR) {
            self.actor = Some(actor);
        }
        ignored
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        KanbanConfig, ENV_ACTOR, ENV_CONNECT_ATTEMPTS, ENV_CONNECT_BACKOFF_MS, ENV_DB_PATH,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn toml_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kanban.toml");
        std::fs::write(&path, "db_path = \"/var/lib/kanban/board.db\"\nconnect_attempts = 2\n")
            .unwrap();

        let config = KanbanConfig::from_file(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/kanban/board.db"));
        assert_eq!(config.connect_attempts, 2);
        assert_eq!(config.connect_backoff_ms, KanbanConfig::default().connect_backoff_ms);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kanban.toml");
        std::fs::write(&path, "connect_attempts = \"many\"").unwrap();

        let err = KanbanConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn overrides_replace_values_and_skip_invalid_numbers() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, " /tmp/board.db "),
            (ENV_CONNECT_ATTEMPTS, "not-a-number"),
            (ENV_ACTOR, "alice"),
        ]);
        let mut config = KanbanConfig::default();
        let ignored = config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/tmp/board.db"));
        assert_eq!(config.connect_attempts, KanbanConfig::default().connect_attempts);
        assert_eq!(config.actor.as_deref(), Some("alice"));
        assert_eq!(ignored.len(), 1);
        assert_eq!(ignored[0].key, ENV_CONNECT_ATTEMPTS);
        assert_eq!(ignored[0].value, "not-a-number");
    }

    #[test]
    fn every_invalid_numeric_override_is_reported() {
        let mut config = KanbanConfig::default();
        let ignored = config.apply_overrides(|key| match key {
            ENV_CONNECT_ATTEMPTS => Some("-1".to_string()),
            ENV_CONNECT_BACKOFF_MS => Some("soon".to_string()),
            _ => None,
        });

        let keys: Vec<&str> = ignored.iter().map(|item| item.key).collect();
        assert_eq!(keys, vec![ENV_CONNECT_ATTEMPTS, ENV_CONNECT_BACKOFF_MS]);
        assert!(ignored[1].to_string().contains("key=KANBAN_CONNECT_BACKOFF_MS"));
        assert_eq!(config, KanbanConfig::default());
    }
}
