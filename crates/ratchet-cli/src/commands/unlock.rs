//! Unlock command implementation

use anyhow::Result;
use ratchet_migrate::TableLock;

use crate::cli::GlobalArgs;
use crate::context::RuntimeContext;

/// Execute the unlock command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;

    if let Some((holder, since)) = TableLock::current_holder(ctx.db.as_ref()).await? {
        log::info!("Releasing run lock held by '{holder}' since {since}");
    }
    if TableLock::force_release(ctx.db.as_ref()).await? {
        println!("run lock released");
    } else {
        println!("no run lock held");
    }
    Ok(())
}
