//! Sync command implementation.

use colored::Colorize;
use serde::Serialize;

use crate::cli::output::print_json;
use crate::cli::workspace::Workspace;
use crate::error::Result;
use crate::model::QueueCounts;
use crate::sync::DrainOutcome;

#[derive(Serialize)]
struct SyncOutput {
    #[serde(flatten)]
    outcome: DrainOutcome,
    queue: QueueCounts,
}

/// Drain the owner's queue once.
///
/// # Errors
///
/// Returns `Error::NoOwner` or a store error. Remote failures are reported
/// in the drain stats, not as errors.
pub async fn execute(ws: &Workspace, json: bool) -> Result<()> {
    let manager = ws.manager()?;
    let outcome = manager.process_queue().await?;
    let queue = ws.ctx.store.queue_counts(Some(manager.owner_id()))?;

    if json {
        return print_json(&SyncOutput { outcome, queue });
    }

    match &outcome {
        DrainOutcome::Offline => {
            let reason = if ws.remote_configured() {
                "remote unreachable"
            } else {
                "no remote configured"
            };
            println!("{} ({reason})", "Offline".yellow().bold());
        }
        DrainOutcome::AlreadyRunning => println!("A sync is already in progress."),
        DrainOutcome::Completed(stats) => {
            println!(
                "Synced {}, failed {}, blocked {}, deferred {}, pruned {}",
                stats.synced.to_string().green(),
                stats.failed.to_string().red(),
                stats.blocked,
                stats.deferred,
                stats.pruned
            );
        }
    }
    println!("{} change(s) still waiting", queue.pending);
    Ok(())
}
