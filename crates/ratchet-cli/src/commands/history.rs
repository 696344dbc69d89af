//! History command implementation

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ratchet_migrate::{Ledger, LedgerEntry};
use serde::Serialize;

use crate::cli::{GlobalArgs, HistoryArgs, OutputFormat};
use crate::context::RuntimeContext;

/// One ledger row as printed by `history`
#[derive(Debug, Serialize)]
struct HistoryRow {
    version: String,
    applied_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for HistoryRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            version: entry.version.to_string(),
            applied_at: entry.applied_at,
        }
    }
}

/// Execute the history command
pub async fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let ledger = Ledger::new(ctx.db.as_ref());
    ledger.ensure_table().await?;
    let entries = ledger.entries().await?;
    let rows: Vec<HistoryRow> = entries.iter().map(HistoryRow::from).collect();

    match args.output {
        OutputFormat::Table => {
            for line in table_lines(&rows) {
                println!("{line}");
            }
        }
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&rows).context("Failed to serialize to JSON")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn table_lines(rows: &[HistoryRow]) -> Vec<String> {
    if rows.is_empty() {
        return vec!["No migrations applied".to_string()];
    }

    let version_width = rows
        .iter()
        .map(|r| r.version.len())
        .max()
        .unwrap_or(0)
        .max("VERSION".len());

    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(format!("{:<version_width$}  APPLIED AT", "VERSION"));
    lines.push(format!("{:-<version_width$}  {:-<10}", "", ""));
    for row in rows {
        lines.push(format!(
            "{:<version_width$}  {}",
            row.version,
            row.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    lines.push(String::new());
    lines.push(format!("{} migration(s) applied", rows.len()));
    lines
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
