//! Test doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use ratchet_db::{Database, DbError, DbResult, DuckDbBackend, Transaction};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Script {
    fail_commit_containing: Option<String>,
    slow_batch_containing: Option<(String, Duration)>,
    batches: Mutex<Vec<String>>,
}

/// In-memory DuckDB that can fail commits or stall batches whose SQL
/// contains a marker string, and remembers every batch it was asked to run.
pub(crate) struct ScriptedDb {
    inner: DuckDbBackend,
    script: Arc<Script>,
}

impl ScriptedDb {
    pub(crate) fn new() -> Self {
        Self {
            inner: DuckDbBackend::in_memory().unwrap(),
            script: Arc::new(Script::default()),
        }
    }

    pub(crate) fn fail_commit_containing(mut self, marker: &str) -> Self {
        self.script_mut().fail_commit_containing = Some(marker.to_string());
        self
    }

    pub(crate) fn slow_batch_containing(mut self, marker: &str, delay: Duration) -> Self {
        self.script_mut().slow_batch_containing = Some((marker.to_string(), delay));
        self
    }

    /// Batches executed inside transactions, in order.
    pub(crate) fn batches(&self) -> Vec<String> {
        self.script.batches.lock().unwrap().clone()
    }

    pub(crate) async fn count(&self, sql: &str) -> i64 {
        let rows = self.inner.query_rows(sql).await.unwrap();
        rows[0][0].parse().unwrap()
    }

    fn script_mut(&mut self) -> &mut Script {
        Arc::get_mut(&mut self.script).expect("script configured before use")
    }
}

#[async_trait]
impl Database for ScriptedDb {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.inner.execute_batch(sql).await
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>> {
        self.inner.query_rows(sql).await
    }

    async fn begin(&self) -> DbResult<Box<dyn Transaction>> {
        Ok(Box::new(ScriptedTx {
            inner: self.inner.begin().await?,
            script: Arc::clone(&self.script),
            fail_commit: false,
        }))
    }

    fn db_type(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedTx {
    inner: Box<dyn Transaction>,
    script: Arc<Script>,
    fail_commit: bool,
}

#[async_trait]
impl Transaction for ScriptedTx {
    async fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.script.batches.lock().unwrap().push(sql.to_string());
        if let Some((marker, delay)) = &self.script.slow_batch_containing {
            if sql.contains(marker.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        if let Some(marker) = &self.script.fail_commit_containing {
            if sql.contains(marker.as_str()) {
                self.fail_commit = true;
            }
        }
        self.inner.execute_batch(sql).await
    }

    async fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<usize> {
        self.inner.execute(sql, params).await
    }

    async fn commit(&mut self) -> DbResult<()> {
        if self.fail_commit {
            self.inner.rollback().await?;
            return Err(DbError::TransactionError(
                "COMMIT failed: injected".to_string(),
            ));
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.inner.rollback().await
    }

    async fn cancel(&mut self) -> DbResult<()> {
        self.inner.cancel().await
    }
}
