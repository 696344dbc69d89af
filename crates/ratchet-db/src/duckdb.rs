//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Transaction};
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How often [`DuckDbTransaction::cancel`] re-sends the interrupt while the
/// batch is still running.
const INTERRUPT_RETRY: Duration = Duration::from_millis(25);

type InterruptFn = Arc<dyn Fn() + Send + Sync>;

/// DuckDB database backend
///
/// Driver calls block, so each one runs on tokio's blocking pool while
/// holding the connection mutex. Transactions are connection-scoped: while a
/// [`DuckDbTransaction`] is open, every statement issued through this backend
/// runs inside it.
pub struct DuckDbBackend {
    conn: Arc<Mutex<Connection>>,
    interrupt: InterruptFn,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        let handle = conn.interrupt_handle();
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt: Arc::new(move || handle.interrupt()),
        }
    }
}

/// Run `body` against the locked connection on the blocking pool.
async fn with_conn<T, F>(conn: &Arc<Mutex<Connection>>, body: F) -> DbResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        body(&guard)
    })
    .await
    .map_err(|e| DbError::Internal(format!("blocking task failed: {e}")))?
}

/// Read a column value as a String, trying multiple DuckDB types.
///
/// DuckDB integer columns return `None` for `Option<String>`, so we try
/// String -> i64 -> f64 -> bool. SQL NULL renders as an empty string.
fn get_column_as_string(row: &duckdb::Row<'_>, idx: usize) -> String {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return s;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return n.to_string();
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return f.to_string();
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return b.to_string();
    }
    String::new()
}

fn query_rows_sync(conn: &Connection, sql: &str) -> DbResult<Vec<Vec<String>>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            let col_count = row.as_ref().column_count();
            Ok((0..col_count)
                .map(|i| get_column_as_string(row, i))
                .collect::<Vec<_>>())
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let sql = sql.to_string();
        with_conn(&self.conn, move |conn| Ok(conn.execute_batch(&sql)?)).await
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>> {
        let sql = sql.to_string();
        with_conn(&self.conn, move |conn| query_rows_sync(conn, &sql)).await
    }

    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        with_conn(&self.conn, |conn| {
            conn.execute_batch("BEGIN TRANSACTION")
                .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
        })
        .await?;
        Ok(Box::new(DuckDbTransaction {
            conn: Arc::clone(&self.conn),
            interrupt: Arc::clone(&self.interrupt),
            busy: Arc::new(AtomicBool::new(false)),
            open: true,
        }))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// Open transaction on a [`DuckDbBackend`] connection
pub struct DuckDbTransaction {
    conn: Arc<Mutex<Connection>>,
    interrupt: InterruptFn,
    /// Set while a batch of this transaction runs on the blocking pool
    busy: Arc<AtomicBool>,
    open: bool,
}

impl DuckDbTransaction {
    fn ensure_open(&self) -> DbResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::TransactionError(
                "transaction already finished".to_string(),
            ))
        }
    }
}

#[async_trait]
impl Transaction for DuckDbTransaction {
    async fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.ensure_open()?;
        let sql = sql.to_string();
        let busy = Arc::clone(&self.busy);
        with_conn(&self.conn, move |conn| {
            busy.store(true, Ordering::SeqCst);
            let result = conn.execute_batch(&sql);
            busy.store(false, Ordering::SeqCst);
            Ok(result?)
        })
        .await
    }

    async fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<usize> {
        self.ensure_open()?;
        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        with_conn(&self.conn, move |conn| {
            Ok(conn.execute(&sql, duckdb::params_from_iter(params.iter()))?)
        })
        .await
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.ensure_open()?;
        self.open = false;
        with_conn(&self.conn, |conn| {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(DbError::TransactionError(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
            Ok(())
        })
        .await
    }

    async fn rollback(&mut self) -> DbResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        with_conn(&self.conn, rollback_sync).await
    }

    async fn cancel(&mut self) -> DbResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        // The interrupt only reaches a statement that is running, and a batch
        // queued on the blocking pool may not have started yet; keep sending
        // it until the rollback gets the connection.
        let busy = Arc::clone(&self.busy);
        let interrupt = Arc::clone(&self.interrupt);
        let rollback = with_conn(&self.conn, rollback_sync);
        tokio::pin!(rollback);
        loop {
            if busy.load(Ordering::SeqCst) {
                (*interrupt)();
            }
            tokio::select! {
                result = &mut rollback => return result,
                _ = tokio::time::sleep(INTERRUPT_RETRY) => {}
            }
        }
    }
}

/// ROLLBACK, retried once: an interrupt sent just as the batch finished can
/// land on the first attempt instead.
fn rollback_sync(conn: &Connection) -> DbResult<()> {
    if let Err(first) = conn.execute_batch("ROLLBACK") {
        log::debug!("ROLLBACK failed, retrying: {first}");
        conn.execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))?;
    }
    Ok(())
}

impl Drop for DuckDbTransaction {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        // A statement may still be running on the blocking pool; never wait
        // for it here.
        match self.conn.try_lock() {
            Ok(conn) => {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    log::warn!("Rollback of abandoned transaction failed: {e}");
                }
            }
            Err(_) => {
                if self.busy.load(Ordering::SeqCst) {
                    (*self.interrupt)();
                }
                log::warn!("Abandoned transaction left open: connection busy");
            }
        }
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
