//! Configuration types and parsing for ratchet.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file names tried by [`Config::load_from_dir`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["ratchet.yml", "ratchet.yaml"];

/// Migrator configuration from ratchet.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directory containing `<version>.up.sql` files
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Upper bound on executing a single migration's SQL batch
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,

    /// Upper bound on a whole `migrate` run
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Cross-process run lock
    #[serde(default)]
    pub lock: LockMode,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// How concurrent migrator processes are kept apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Assume a single migrator runs at a time
    #[default]
    None,
    /// Hold a row in `schema_migrations_lock` for the duration of a run
    Table,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::None => write!(f, "none"),
            LockMode::Table => write!(f, "table"),
        }
    }
}

const DEFAULT_DB_PATH: &str = "ratchet.duckdb";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_exec_timeout_secs() -> u64 {
    30
}

fn default_run_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            migrations_dir: default_migrations_dir(),
            exec_timeout_secs: default_exec_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            lock: LockMode::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a directory, looking for ratchet.yml or ratchet.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Like [`load_from_dir`](Self::load_from_dir), but a directory without a
    /// config file yields the defaults.
    pub fn load_from_dir_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::load_from_dir(dir) {
            Err(CoreError::ConfigNotFound { .. }) => {
                log::debug!("No config file in {}, using defaults", dir.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Execution timeout for a single migration batch
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// Deadline budget for a whole run
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> CoreResult<()> {
        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.exec_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "exec_timeout_secs must be greater than zero".to_string(),
            });
        }

        if self.run_timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "run_timeout_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
