//! Applies one migration unit atomically.
//!
//! The unit's SQL batch and its ledger row run in a single transaction:
//! read → begin → exec (bounded) → record → commit. A failure at any step
//! rolls the transaction back, so a ledger row never exists without the
//! schema change it stands for. A batch that outlives its bound is
//! interrupted in the database before the rollback.

use crate::error::{display_chain, ApplyCause, ApplyPhase, MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::orchestrator::RunOptions;
use crate::source::{MigrationSource, MigrationUnit};
use ratchet_db::{Database, Transaction};
use std::time::Duration;
use tokio::time::Instant;

/// Default bound on executing a single migration's SQL batch.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs units of one source against one database.
pub struct Applier<'a> {
    db: &'a dyn Database,
    source: &'a dyn MigrationSource,
    options: &'a RunOptions,
}

impl<'a> Applier<'a> {
    pub fn new(
        db: &'a dyn Database,
        source: &'a dyn MigrationSource,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            db,
            source,
            options,
        }
    }

    /// Apply `unit` and record it in the ledger, or change nothing.
    pub async fn apply(&self, unit: &MigrationUnit) -> MigrateResult<()> {
        let fail = |phase: ApplyPhase, cause: ApplyCause| MigrateError::Apply {
            phase,
            version: unit.version.clone(),
            cause,
        };

        log::debug!("Applying migration {}", unit.version);

        self.check_boundary()
            .map_err(|cause| fail(ApplyPhase::Read, cause))?;
        let sql = self
            .source
            .read(&unit.location)
            .map_err(|e| fail(ApplyPhase::Read, e.into()))?;

        self.check_boundary()
            .map_err(|cause| fail(ApplyPhase::Exec, cause))?;
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| fail(ApplyPhase::Exec, e.into()))?;

        let (budget, deadline_bound) = self.exec_budget();
        match tokio::time::timeout(budget, tx.execute_batch(&sql)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(abort(tx, fail(ApplyPhase::Exec, e.into())).await),
            Err(_) => {
                let cause = if deadline_bound {
                    ApplyCause::DeadlineExceeded
                } else {
                    ApplyCause::Timeout(budget)
                };
                return Err(interrupt(tx, fail(ApplyPhase::Exec, cause)).await);
            }
        }

        if let Err(cause) = self.check_boundary() {
            return Err(abort(tx, fail(ApplyPhase::Record, cause)).await);
        }
        if let Err(e) = Ledger::record(tx.as_mut(), &unit.version).await {
            return Err(abort(tx, fail(ApplyPhase::Record, e.into())).await);
        }

        if let Err(cause) = self.check_boundary() {
            return Err(abort(tx, fail(ApplyPhase::Commit, cause)).await);
        }
        tx.commit()
            .await
            .map_err(|e| fail(ApplyPhase::Commit, e.into()))?;

        log::info!("Applied migration {}", unit.version);
        Ok(())
    }

    fn check_boundary(&self) -> Result<(), ApplyCause> {
        match self.options.interruption() {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }

    /// Time the batch may run, and whether that bound is the run deadline
    /// rather than the per-migration timeout.
    fn exec_budget(&self) -> (Duration, bool) {
        let exec_timeout = self.options.exec_timeout;
        match self.options.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining < exec_timeout {
                    (remaining, true)
                } else {
                    (exec_timeout, false)
                }
            }
            None => (exec_timeout, false),
        }
    }
}

/// Roll back `tx` and hand back the error that caused it.
async fn abort(mut tx: Box<dyn Transaction>, err: MigrateError) -> MigrateError {
    log::warn!("{}; rolling back", display_chain(&err));
    if let Err(e) = tx.rollback().await {
        log::warn!("Rollback failed: {e}");
    }
    err
}

/// Stop the batch still running in `tx`, roll back, and hand back `err`.
async fn interrupt(mut tx: Box<dyn Transaction>, err: MigrateError) -> MigrateError {
    log::warn!("{}; interrupting and rolling back", display_chain(&err));
    if let Err(e) = tx.cancel().await {
        log::warn!("Rollback failed: {e}");
    }
    err
}

#[cfg(test)]
#[path = "applier_test.rs"]
mod tests;
