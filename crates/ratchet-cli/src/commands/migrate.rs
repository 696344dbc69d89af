//! Migrate command implementation

use anyhow::{bail, Result};
use ratchet_core::{Config, LockMode};
use ratchet_migrate::{apply_pending, CancelFlag, FsSource, RunOptions, TableLock};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::context::RuntimeContext;

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let source = FsSource::new(&ctx.config.migrations_dir);

    let cancel = CancelFlag::new();
    let options = run_options(&ctx.config, args)?.with_cancel(cancel.clone());
    let interrupt = cancel_on_ctrl_c(cancel);

    log::debug!(
        "Migrating {} from {} (exec timeout {:?})",
        ctx.config.database.path,
        ctx.config.migrations_dir,
        options.exec_timeout
    );
    let result = apply_pending(ctx.db.as_ref(), &source, &options).await;
    interrupt.abort();

    match result {
        Ok(report) => {
            println!("migrations applied: {}", report.applied_count());
            Ok(())
        }
        Err(failure) => {
            println!("migrations applied: {}", failure.applied_count());
            Err(failure.into())
        }
    }
}

/// Timeouts from flags, falling back to config; lock per config.
pub(crate) fn run_options(config: &Config, args: &MigrateArgs) -> Result<RunOptions> {
    let exec_timeout = seconds_or(args.exec_timeout, config.exec_timeout(), "--exec-timeout")?;
    let run_timeout = seconds_or(args.timeout, config.run_timeout(), "--timeout")?;

    let mut options = RunOptions::default()
        .with_exec_timeout(exec_timeout)
        .with_timeout(run_timeout);
    if config.lock == LockMode::Table {
        options = options.with_lock(Arc::new(TableLock::for_current_process()));
    }
    Ok(options)
}

fn seconds_or(flag: Option<u64>, fallback: Duration, name: &str) -> Result<Duration> {
    match flag {
        Some(0) => bail!("{name} must be greater than zero"),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(fallback),
    }
}

/// Set `cancel` on the first Ctrl-C so the run stops at the next step boundary.
fn cancel_on_ctrl_c(cancel: CancelFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current step");
            cancel.cancel();
        }
    })
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
