//! The `schema_migrations` ledger.
//!
//! One row per applied version. Rows are only ever inserted, and only inside
//! the transaction that ran the version's SQL (see [`crate::Applier`]).

use crate::error::{MigrateError, MigrateResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use ratchet_core::Version;
use ratchet_db::{Database, DbError, DbResult, Transaction};
use std::collections::BTreeSet;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "schema_migrations";

fn ensure_ledger_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
    version    TEXT PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT current_timestamp
);"
    )
}

fn list_applied_sql() -> String {
    format!("SELECT version FROM {LEDGER_TABLE}")
}

fn list_entries_sql() -> String {
    format!("SELECT version, CAST(applied_at AS VARCHAR) FROM {LEDGER_TABLE} ORDER BY version")
}

fn record_sql() -> String {
    format!("INSERT INTO {LEDGER_TABLE} (version, applied_at) VALUES (?, current_timestamp)")
}

/// A recorded migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: Version,
    pub applied_at: DateTime<Utc>,
}

/// Reads the ledger table of one database.
pub struct Ledger<'a> {
    db: &'a dyn Database,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Create the ledger table if it does not exist. Safe to call every run.
    pub async fn ensure_table(&self) -> MigrateResult<()> {
        self.db
            .execute_batch(&ensure_ledger_sql())
            .await
            .map_err(|e| ledger_error("bootstrap", e))
    }

    /// Every recorded version.
    pub async fn list_applied(&self) -> MigrateResult<BTreeSet<Version>> {
        let rows = self
            .db
            .query_rows(&list_applied_sql())
            .await
            .map_err(|e| ledger_error("query", e))?;

        let mut applied = BTreeSet::new();
        for row in rows {
            match row.into_iter().next().and_then(Version::try_new) {
                Some(version) => {
                    applied.insert(version);
                }
                None => log::warn!("Ignoring ledger row with an empty version"),
            }
        }
        Ok(applied)
    }

    /// Every ledger entry, ordered by version.
    pub async fn entries(&self) -> MigrateResult<Vec<LedgerEntry>> {
        let rows = self
            .db
            .query_rows(&list_entries_sql())
            .await
            .map_err(|e| ledger_error("query", e))?;

        rows.into_iter()
            .filter_map(|row| {
                let mut cols = row.into_iter();
                let Some(version) = cols.next().and_then(Version::try_new) else {
                    log::warn!("Ignoring ledger row with an empty version");
                    return None;
                };
                let raw = cols.next().unwrap_or_default();
                Some(match parse_applied_at(&raw) {
                    Some(applied_at) => Ok(LedgerEntry {
                        version,
                        applied_at,
                    }),
                    None => Err(ledger_error(
                        "scan",
                        DbError::Internal(format!(
                            "unparseable applied_at '{raw}' for version {version}"
                        )),
                    )),
                })
            })
            .collect()
    }

    /// Insert the ledger row for `version` inside `tx`.
    pub(crate) async fn record(tx: &mut dyn Transaction, version: &Version) -> DbResult<()> {
        tx.execute(&record_sql(), &[version.as_str()]).await?;
        Ok(())
    }
}

fn ledger_error(action: &'static str, source: DbError) -> MigrateError {
    MigrateError::Ledger { action, source }
}

/// Parse a timestamp rendered by the database, with or without a UTC offset.
fn parse_applied_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z")
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .ok()
        })
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
