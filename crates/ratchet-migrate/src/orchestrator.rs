//! Run orchestration: bootstrap, discover, diff against the ledger, apply.
//!
//! A run moves through
//! `Init → TableEnsured → Discovered → PendingComputed → Applying(i) → Done`,
//! or ends in `Failed(i)` when unit `i` of the pending set fails. Units that
//! committed before a failure stay applied.

use crate::applier::{Applier, DEFAULT_EXEC_TIMEOUT};
use crate::error::{display_chain, ApplyCause, MigrateError};
use crate::ledger::Ledger;
use crate::lock::{NoLock, RunLock};
use crate::source::{discover, MigrationSource, MigrationUnit};
use ratchet_core::Version;
use ratchet_db::Database;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Shared flag a caller sets to stop a run at the next phase boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits and hooks for one run.
#[derive(Clone)]
pub struct RunOptions {
    /// Bound on executing a single unit's SQL batch
    pub exec_timeout: Duration,
    /// Bound on the whole run
    pub deadline: Option<Instant>,
    /// Checked at every phase boundary
    pub cancel: Option<CancelFlag>,
    /// Held from before bootstrap until the run ends
    pub lock: Arc<dyn RunLock>,
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("exec_timeout", &self.exec_timeout)
            .field("deadline", &self.deadline)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
            deadline: None,
            cancel: None,
            lock: Arc::new(NoLock),
        }
    }
}

impl RunOptions {
    pub fn with_exec_timeout(mut self, exec_timeout: Duration) -> Self {
        self.exec_timeout = exec_timeout;
        self
    }

    /// Set the deadline to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_lock(mut self, lock: Arc<dyn RunLock>) -> Self {
        self.lock = lock;
        self
    }

    /// Why the run must stop now, if it must.
    pub(crate) fn interruption(&self) -> Option<ApplyCause> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Some(ApplyCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ApplyCause::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    TableEnsured,
    Discovered,
    PendingComputed,
    /// Applying the unit at this index of the pending set
    Applying(usize),
    Done,
    /// The unit at this index of the pending set failed
    Failed(usize),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Init => write!(f, "init"),
            RunState::TableEnsured => write!(f, "table-ensured"),
            RunState::Discovered => write!(f, "discovered"),
            RunState::PendingComputed => write!(f, "pending-computed"),
            RunState::Applying(i) => write!(f, "applying({i})"),
            RunState::Done => write!(f, "done"),
            RunState::Failed(i) => write!(f, "failed({i})"),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Versions applied by this run, in apply order
    pub applied: Vec<Version>,
}

impl RunReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Outcome of a failed run.
///
/// `state` is the last state reached: `Failed(i)` for a unit failure,
/// otherwise the state the run was in when the step after it failed.
#[derive(Debug, thiserror::Error)]
#[error("Migration run failed in state {state} ({count} migration(s) applied before the failure)", count = .applied.len())]
pub struct RunFailure {
    /// Versions that committed before the failure
    pub applied: Vec<Version>,
    pub state: RunState,
    #[source]
    pub error: MigrateError,
}

impl RunFailure {
    fn new(applied: Vec<Version>, state: RunState, error: MigrateError) -> Self {
        log::debug!("Migration run failed in state {state}");
        Self {
            applied,
            state,
            error,
        }
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Units of `discovered` with no ledger entry, keeping discovery order.
pub fn pending_units(
    discovered: Vec<MigrationUnit>,
    applied: &BTreeSet<Version>,
) -> Vec<MigrationUnit> {
    discovered
        .into_iter()
        .filter(|unit| !applied.contains(&unit.version))
        .collect()
}

/// Apply every pending migration of `source` to `db`, in version order.
///
/// Stops at the first failure. The returned [`RunFailure`] lists the versions
/// that did commit; they stay applied.
pub async fn apply_pending(
    db: &dyn Database,
    source: &dyn MigrationSource,
    options: &RunOptions,
) -> Result<RunReport, RunFailure> {
    if let Some(cause) = options.interruption() {
        return Err(RunFailure::new(
            Vec::new(),
            RunState::Init,
            MigrateError::Aborted { cause },
        ));
    }

    options
        .lock
        .acquire(db)
        .await
        .map_err(|e| RunFailure::new(Vec::new(), RunState::Init, e))?;

    let result = run(db, source, options).await;

    match (result, options.lock.release(db).await) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(report), Err(e)) => Err(RunFailure::new(report.applied, RunState::Done, e)),
        (Err(failure), Ok(())) => Err(failure),
        (Err(failure), Err(e)) => {
            log::warn!(
                "Failed to release run lock after failed run: {}",
                display_chain(&e)
            );
            Err(failure)
        }
    }
}

async fn run(
    db: &dyn Database,
    source: &dyn MigrationSource,
    options: &RunOptions,
) -> Result<RunReport, RunFailure> {
    let ledger = Ledger::new(db);
    let mut state = RunState::Init;

    ledger
        .ensure_table()
        .await
        .map_err(|e| RunFailure::new(Vec::new(), state, e))?;
    state = advance(state, RunState::TableEnsured);

    let discovered = discover(source).map_err(|e| RunFailure::new(Vec::new(), state, e))?;
    state = advance(state, RunState::Discovered);

    let applied_set = ledger
        .list_applied()
        .await
        .map_err(|e| RunFailure::new(Vec::new(), state, e))?;
    let pending = pending_units(discovered, &applied_set);
    state = advance(state, RunState::PendingComputed);

    if pending.is_empty() {
        log::info!("No pending migrations");
    } else {
        log::info!("{} pending migration(s)", pending.len());
    }

    let applier = Applier::new(db, source, options);
    let mut applied = Vec::with_capacity(pending.len());
    for (i, unit) in pending.iter().enumerate() {
        state = advance(state, RunState::Applying(i));
        if let Err(e) = applier.apply(unit).await {
            return Err(RunFailure::new(applied, RunState::Failed(i), e));
        }
        applied.push(unit.version.clone());
    }
    advance(state, RunState::Done);

    Ok(RunReport { applied })
}

fn advance(from: RunState, to: RunState) -> RunState {
    log::debug!("Migration run: {from} -> {to}");
    to
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
