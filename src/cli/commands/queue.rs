//! Sync queue inspection and pruning.

use colored::Colorize;
use serde::Serialize;

use crate::cli::QueueCommands;
use crate::cli::output::{print_json, short_id, truncate};
use crate::cli::workspace::Workspace;
use crate::error::{Error, Result};
use crate::model::QueueEntry;

#[derive(Serialize)]
struct QueueListOutput {
    entries: Vec<QueueEntry>,
    count: usize,
}

#[derive(Serialize)]
struct PruneOutput {
    pruned: usize,
    retention_hours: i64,
}

/// Execute queue commands.
///
/// Queue commands are not owner-scoped; they show the whole local queue.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn execute(command: &QueueCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        QueueCommands::List { all, limit } => list(ws, *all, *limit, json),
        QueueCommands::Prune { older_than } => prune(ws, *older_than, json),
    }
}

fn list(ws: &Workspace, include_synced: bool, limit: usize, json: bool) -> Result<()> {
    let entries = ws.ctx.store.list_queue(include_synced, limit)?;

    if json {
        let count = entries.len();
        return print_json(&QueueListOutput { entries, count });
    }

    if entries.is_empty() {
        println!("Sync queue is empty.");
        return Ok(());
    }
    for entry in &entries {
        let state = if entry.synced {
            "synced".green()
        } else if entry.attempts > 0 {
            format!("failed x{}", entry.attempts).red()
        } else {
            "pending".yellow()
        };
        println!(
            "#{:<5} {:<6} {}/{} {} {}",
            entry.id,
            entry.operation.as_str(),
            entry.collection_name,
            short_id(&entry.record_id),
            state,
            entry.created_at.dimmed()
        );
        if let Some(err) = entry.last_error.as_deref().filter(|_| !entry.synced) {
            println!("       {}", truncate(err, 90).dimmed());
        }
    }
    Ok(())
}

fn prune(ws: &Workspace, older_than: Option<i64>, json: bool) -> Result<()> {
    let retention = match older_than {
        Some(h) if h < 0 => {
            return Err(Error::InvalidArgument(format!(
                "retention must be zero or more hours, got {h}"
            )));
        }
        Some(h) => chrono::Duration::hours(h),
        None => ws.config.retention(),
    };

    let cutoff = chrono::Utc::now() - retention;
    let pruned = ws.ctx.store.prune_synced_older_than(cutoff)?;

    if json {
        return print_json(&PruneOutput {
            pruned,
            retention_hours: retention.num_hours(),
        });
    }
    println!(
        "Pruned {pruned} synced entr{} older than {}h",
        if pruned == 1 { "y" } else { "ies" },
        retention.num_hours()
    );
    Ok(())
}
