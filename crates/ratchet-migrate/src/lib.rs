//! Forward-only SQL migration engine.
//!
//! Discovers `<version>.up.sql` units from a [`MigrationSource`], compares
//! them against the `schema_migrations` ledger kept in the target database,
//! and applies the pending ones in ascending version order. Each unit's SQL
//! batch and its ledger row commit in one transaction.

pub mod applier;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod orchestrator;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use applier::{Applier, DEFAULT_EXEC_TIMEOUT};
pub use error::{ApplyCause, ApplyPhase, MigrateError, MigrateResult};
pub use ledger::{Ledger, LedgerEntry, LEDGER_TABLE};
pub use lock::{NoLock, RunLock, TableLock, LOCK_TABLE};
pub use orchestrator::{
    apply_pending, pending_units, CancelFlag, RunFailure, RunOptions, RunReport, RunState,
};
pub use source::{discover, EmbeddedSource, FsSource, MigrationSource, MigrationUnit, UP_SUFFIX};
