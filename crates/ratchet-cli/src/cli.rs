//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ratchet - forward-only SQL migrations
#[derive(Parser, Debug)]
#[command(name = "ratchet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: ratchet.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path
    #[arg(short, long, global = true, env = "RATCHET_DATABASE")]
    pub database: Option<String>,

    /// Override migrations directory
    #[arg(short, long, global = true, env = "RATCHET_MIGRATIONS_DIR")]
    pub migrations_dir: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending migration in version order
    Migrate(MigrateArgs),

    /// List applied migrations from the ledger
    History(HistoryArgs),

    /// Clear a run lock left behind by a crashed run
    Unlock,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Per-migration execution timeout in seconds
    #[arg(long = "exec-timeout", value_name = "SECS")]
    pub exec_timeout: Option<u64>,

    /// Timeout for the whole run in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// History output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns
    Table,
    /// JSON array
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
