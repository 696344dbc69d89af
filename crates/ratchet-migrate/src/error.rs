//! Error types for the migration engine.

use ratchet_core::Version;
use ratchet_db::DbError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Step of [`crate::Applier::apply`] at which a unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    /// Loading the SQL batch from the source
    Read,
    /// Opening the transaction or executing the batch
    Exec,
    /// Inserting the ledger row
    Record,
    /// Committing
    Commit,
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyPhase::Read => write!(f, "read"),
            ApplyPhase::Exec => write!(f, "exec"),
            ApplyPhase::Record => write!(f, "record"),
            ApplyPhase::Commit => write!(f, "commit"),
        }
    }
}

/// Underlying reason a unit failed or a run was aborted.
#[derive(Error, Debug)]
pub enum ApplyCause {
    /// The source could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The database rejected a statement, the ledger insert, or the commit
    #[error(transparent)]
    Database(#[from] DbError),

    /// The SQL batch ran longer than the per-migration execution timeout
    #[error("execution exceeded {0:?}")]
    Timeout(Duration),

    /// The caller's run deadline passed
    #[error("run deadline exceeded")]
    DeadlineExceeded,

    /// The caller cancelled the run
    #[error("run cancelled")]
    Cancelled,
}

/// Migration engine errors. Every variant is fatal to the current run.
///
/// Messages name only this layer; the underlying error is the `source()`.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// The migration source could not be enumerated (MG001)
    #[error("[MG001] Failed to read migration source '{root}'")]
    Discovery {
        root: String,
        source: std::io::Error,
    },

    /// Creating or querying the ledger table failed (MG002)
    #[error("[MG002] Ledger {action} failed")]
    Ledger {
        action: &'static str,
        source: DbError,
    },

    /// A migration unit failed; nothing of it was committed (MG003)
    #[error("[MG003] Migration {version} failed during {phase}")]
    Apply {
        phase: ApplyPhase,
        version: Version,
        #[source]
        cause: ApplyCause,
    },

    /// Acquiring or releasing the run lock failed (MG004)
    #[error("[MG004] Run lock {action} failed")]
    Lock {
        action: &'static str,
        source: DbError,
    },

    /// Another run holds the lock (MG005)
    #[error("[MG005] Migrations are locked by '{holder}' since {since}")]
    LockHeld { holder: String, since: String },

    /// The run was cancelled or out of time before any unit started (MG006)
    #[error("[MG006] Run aborted")]
    Aborted {
        #[source]
        cause: ApplyCause,
    },
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// Phase of a failed unit, if this is an apply failure.
    pub fn phase(&self) -> Option<ApplyPhase> {
        match self {
            MigrateError::Apply { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Version of a failed unit, if this is an apply failure.
    pub fn version(&self) -> Option<&Version> {
        match self {
            MigrateError::Apply { version, .. } => Some(version),
            _ => None,
        }
    }
}

/// `err` followed by each of its sources, colon separated, for log lines.
pub(crate) fn display_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut next = err.source();
    while let Some(source) = next {
        out.push_str(": ");
        out.push_str(&source.to_string());
        next = source.source();
    }
    out
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
