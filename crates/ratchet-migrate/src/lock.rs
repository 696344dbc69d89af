//! Run lock hook.
//!
//! The engine does not coordinate concurrent migrators on its own: two runs
//! racing on the same pending version end with one of them failing at the
//! ledger insert. A [`RunLock`] lets a deployment fail fast instead.

use crate::error::{MigrateError, MigrateResult};
use async_trait::async_trait;
use ratchet_db::{Database, DbError};

/// Name of the table used by [`TableLock`].
pub const LOCK_TABLE: &str = "schema_migrations_lock";

fn ensure_lock_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {LOCK_TABLE} (
    id          INTEGER PRIMARY KEY,
    holder      TEXT NOT NULL,
    acquired_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
);"
    )
}

fn acquire_sql() -> String {
    format!("INSERT INTO {LOCK_TABLE} (id, holder) VALUES (1, ?)")
}

fn release_sql() -> String {
    format!("DELETE FROM {LOCK_TABLE} WHERE id = 1 AND holder = ?")
}

fn force_release_sql() -> String {
    format!("DELETE FROM {LOCK_TABLE} WHERE id = 1")
}

fn holder_sql() -> String {
    format!("SELECT holder, CAST(acquired_at AS VARCHAR) FROM {LOCK_TABLE} WHERE id = 1")
}

/// Mutual exclusion between migrator runs.
#[async_trait]
pub trait RunLock: Send + Sync {
    /// Take the lock or fail without waiting.
    async fn acquire(&self, db: &dyn Database) -> MigrateResult<()>;

    /// Give the lock back.
    async fn release(&self, db: &dyn Database) -> MigrateResult<()>;
}

/// Assumes a single migrator runs at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLock;

#[async_trait]
impl RunLock for NoLock {
    async fn acquire(&self, _db: &dyn Database) -> MigrateResult<()> {
        Ok(())
    }

    async fn release(&self, _db: &dyn Database) -> MigrateResult<()> {
        Ok(())
    }
}

/// Advisory lock stored as a single row in `schema_migrations_lock`.
///
/// A run that crashes leaves the row behind; [`TableLock::force_release`]
/// clears it.
#[derive(Debug, Clone)]
pub struct TableLock {
    holder: String,
}

impl TableLock {
    pub fn new(holder: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
        }
    }

    /// Lock identified by this process id.
    pub fn for_current_process() -> Self {
        Self::new(format!("pid:{}", std::process::id()))
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Delete the lock row whoever holds it. Returns whether a row existed.
    pub async fn force_release(db: &dyn Database) -> MigrateResult<bool> {
        ensure_lock_table(db).await?;
        let removed = execute_in_tx(db, &force_release_sql(), &[])
            .await
            .map_err(|e| lock_error("release", e))?;
        Ok(removed > 0)
    }

    /// Current holder and acquisition time, if the lock is held.
    pub async fn current_holder(db: &dyn Database) -> MigrateResult<Option<(String, String)>> {
        ensure_lock_table(db).await?;
        let rows = db
            .query_rows(&holder_sql())
            .await
            .map_err(|e| lock_error("query", e))?;
        Ok(rows.into_iter().next().map(|row| {
            let mut cols = row.into_iter();
            let holder = cols.next().unwrap_or_default();
            let since = cols.next().unwrap_or_default();
            (holder, since)
        }))
    }
}

#[async_trait]
impl RunLock for TableLock {
    async fn acquire(&self, db: &dyn Database) -> MigrateResult<()> {
        ensure_lock_table(db).await?;
        match execute_in_tx(db, &acquire_sql(), &[self.holder.as_str()]).await {
            Ok(_) => {
                log::debug!("Acquired run lock as {}", self.holder);
                Ok(())
            }
            Err(DbError::ConstraintViolation(_)) => {
                let (holder, since) = Self::current_holder(db)
                    .await?
                    .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));
                Err(MigrateError::LockHeld { holder, since })
            }
            Err(e) => Err(lock_error("acquire", e)),
        }
    }

    async fn release(&self, db: &dyn Database) -> MigrateResult<()> {
        let removed = execute_in_tx(db, &release_sql(), &[self.holder.as_str()])
            .await
            .map_err(|e| lock_error("release", e))?;
        if removed == 0 {
            log::warn!("Run lock for {} was already gone at release", self.holder);
        } else {
            log::debug!("Released run lock held by {}", self.holder);
        }
        Ok(())
    }
}

async fn ensure_lock_table(db: &dyn Database) -> MigrateResult<()> {
    db.execute_batch(&ensure_lock_sql())
        .await
        .map_err(|e| lock_error("bootstrap", e))
}

/// Run one parameterised statement in its own transaction.
async fn execute_in_tx(db: &dyn Database, sql: &str, params: &[&str]) -> Result<usize, DbError> {
    let mut tx = db.begin().await?;
    match tx.execute(sql, params).await {
        Ok(affected) => {
            tx.commit().await?;
            Ok(affected)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::warn!("Rollback failed: {rollback_err}");
            }
            Err(e)
        }
    }
}

fn lock_error(action: &'static str, source: DbError) -> MigrateError {
    MigrateError::Lock { action, source }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
