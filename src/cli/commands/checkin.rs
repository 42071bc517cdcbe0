//! Daily check-in command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::cli::CheckinCommands;
use crate::cli::output::{outcome_label, print_json, rejected};
use crate::cli::workspace::Workspace;
use crate::error::Result;
use crate::model::DailySync;
use crate::model::daily_sync::today;
use crate::validate::normalize_energy;

#[derive(Serialize)]
struct CheckinListOutput {
    checkins: Vec<DailySync>,
    count: usize,
}

/// Execute check-in commands.
///
/// # Errors
///
/// Returns an error for bad input or store failures.
pub async fn execute(command: &CheckinCommands, ws: &Workspace, json: bool) -> Result<()> {
    let repo = ws.repository::<DailySync>().await?;

    match command {
        CheckinCommands::Save {
            energy,
            reflection,
            date,
        } => {
            let energy = normalize_energy(energy).map_err(|r| rejected("energy", r))?;
            let date = date.clone().unwrap_or_else(today);
            let mutation = repo.save_today(&date, energy, reflection.clone()).await?;

            if json {
                return print_json(&mutation);
            }
            println!(
                "Checked in for {} at energy {} [{}]",
                mutation.record.sync_date.bold(),
                mutation.record.energy_level,
                outcome_label(&mutation.outcome)
            );
        }
        CheckinCommands::List { limit } => {
            let checkins: Vec<DailySync> = repo.items().into_iter().take(*limit).collect();

            if json {
                let count = checkins.len();
                return print_json(&CheckinListOutput { checkins, count });
            }
            if checkins.is_empty() {
                println!("No check-ins yet.");
            }
            for c in &checkins {
                let bar = format!("{:<5}", "#".repeat(usize::from(c.energy_level)));
                println!(
                    "{} {} {}",
                    c.sync_date.bold(),
                    bar.green(),
                    c.reflection.as_deref().unwrap_or_default().dimmed()
                );
            }
        }
    }
    Ok(())
}
