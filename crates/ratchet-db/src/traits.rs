//! Database trait definitions

use crate::error::DbResult;
use async_trait::async_trait;

/// Database handle the migration engine runs against
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute one or more SQL statements outside an explicit transaction
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and return every row with each column rendered as a string
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>>;

    /// Open a transaction
    async fn begin(&self) -> DbResult<Box<dyn Transaction>>;

    /// Database type identifier, logged when a connection is opened
    fn db_type(&self) -> &'static str;
}

/// An open transaction
///
/// Dropping a transaction that was neither committed nor rolled back is a
/// bug in the caller; implementations roll back on a best-effort basis.
#[async_trait]
pub trait Transaction: Send {
    /// Execute a multi-statement SQL batch in one round-trip
    async fn execute_batch(&mut self, sql: &str) -> DbResult<()>;

    /// Execute a single statement with positional string parameters,
    /// returning the number of affected rows
    async fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<usize>;

    /// Commit. On failure the transaction is rolled back.
    async fn commit(&mut self) -> DbResult<()>;

    /// Roll back. A no-op if the transaction already finished.
    async fn rollback(&mut self) -> DbResult<()>;

    /// Stop a batch that may still be running for this transaction, then roll
    /// back. Used after the caller gave up waiting on [`execute_batch`].
    ///
    /// [`execute_batch`]: Transaction::execute_batch
    async fn cancel(&mut self) -> DbResult<()> {
        self.rollback().await
    }
}
