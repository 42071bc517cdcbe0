//! Status command implementation.

use colored::Colorize;
use serde::Serialize;

use crate::cli::output::print_json;
use crate::cli::workspace::Workspace;
use crate::error::Result;
use crate::model::{COLLECTIONS, QueueCounts};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    database: String,
    owner: Option<String>,
    remote_configured: bool,
    online: bool,
    migrations: Vec<String>,
    records: Vec<CollectionCount>,
    queue: QueueCounts,
}

#[derive(Serialize)]
struct CollectionCount {
    collection: &'static str,
    count: usize,
}

/// Execute status command.
///
/// Works without an owner; counts are then for every owner in the store.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn execute(ws: &Workspace, json: bool) -> Result<()> {
    let owner = ws.owner().ok();

    let records = COLLECTIONS
        .iter()
        .map(|schema| -> Result<CollectionCount> {
            Ok(CollectionCount {
                collection: schema.name,
                count: ws.ctx.store.get_all(schema.name, owner.as_deref())?.len(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let queue = ws.ctx.store.queue_counts(owner.as_deref())?;

    let output = StatusOutput {
        database: ws.db_path.display().to_string(),
        owner,
        remote_configured: ws.remote_configured(),
        online: ws.is_online(),
        migrations: ws.store.applied_migrations()?,
        records,
        queue,
    };

    if json {
        return print_json(&output);
    }

    println!("{}", "Flowmate Status".bold());
    println!("===============");
    println!();
    println!("Store:  {}", output.database);
    match &output.owner {
        Some(owner) => println!("Owner:  {owner}"),
        None => println!("Owner:  {}", "(not set)".dimmed()),
    }
    let connection = match (output.remote_configured, output.online) {
        (false, _) => "no remote configured".dimmed(),
        (true, true) => "online".green(),
        (true, false) => "offline".yellow(),
    };
    println!("Remote: {connection}");
    println!();

    println!("{}", "Records".cyan().bold());
    for c in &output.records {
        println!("  {:<16} {}", c.collection, c.count);
    }
    println!();

    println!("{}", "Sync queue".cyan().bold());
    println!("  Pending: {}", output.queue.pending);
    if output.queue.failing > 0 {
        println!("  Failing: {}", output.queue.failing.to_string().red());
    }
    println!("  Synced (awaiting prune): {}", output.queue.synced);
    if output.queue.pending > 0 && output.online {
        println!();
        println!("Run `fm sync` to replay pending changes.");
    }
    Ok(())
}
