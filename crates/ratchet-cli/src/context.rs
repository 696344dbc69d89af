//! Runtime context for CLI commands

use anyhow::{Context, Result};
use ratchet_core::Config;
use ratchet_db::{Database, DuckDbBackend};
use std::path::Path;
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Loaded configuration and open database connection
pub struct RuntimeContext {
    /// Config file contents with CLI overrides applied
    pub config: Config,

    /// Database connection
    pub db: Arc<dyn Database>,
}

impl RuntimeContext {
    /// Load configuration and connect to the database
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let config = resolve_config(args)?;

        let db: Arc<dyn Database> = Arc::new(
            DuckDbBackend::new(&config.database.path).with_context(|| {
                format!("Failed to open database '{}'", config.database.path)
            })?,
        );
        log::debug!("Opened {} database {}", db.db_type(), config.database.path);

        Ok(Self { config, db })
    }
}

/// Config file (explicit or discovered), then CLI and environment overrides.
pub(crate) fn resolve_config(args: &GlobalArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            Config::load(Path::new(path)).context("Failed to load configuration file")?
        }
        None => Config::load_from_dir_or_default(Path::new("."))
            .context("Failed to load configuration")?,
    };

    if let Some(database) = &args.database {
        config.database.path = database.clone();
    }
    if let Some(dir) = &args.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
