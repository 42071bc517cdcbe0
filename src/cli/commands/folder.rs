//! Folder command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::cli::FolderCommands;
use crate::cli::output::{outcome_label, print_json, short_id};
use crate::cli::workspace::{Workspace, resolve_record_id};
use crate::error::Result;
use crate::model::Folder;

#[derive(Serialize)]
struct FolderRow {
    #[serde(flatten)]
    folder: Folder,
    note_count: usize,
}

#[derive(Serialize)]
struct FolderListOutput {
    folders: Vec<FolderRow>,
    count: usize,
}

#[derive(Serialize)]
struct FolderDeleteOutput<'a> {
    id: &'a str,
    unfiled_notes: usize,
    outcome: crate::sync::WriteOutcome,
}

/// Execute folder commands.
///
/// # Errors
///
/// Returns an error for unknown ids or store failures.
pub async fn execute(command: &FolderCommands, ws: &Workspace, json: bool) -> Result<()> {
    let notes = ws.notes().await?;

    match command {
        FolderCommands::Add { name, parent } => {
            let parent_id = parent
                .as_deref()
                .map(|p| resolve_record_id(&notes.folders, p))
                .transpose()?;
            let mutation = notes.create_folder(name, parent_id.as_deref()).await?;

            if json {
                return print_json(&mutation);
            }
            println!(
                "Created folder {} {} [{}]",
                short_id(&mutation.record.id).dimmed(),
                mutation.record.name.bold(),
                outcome_label(&mutation.outcome)
            );
        }
        FolderCommands::List => {
            let folders: Vec<FolderRow> = notes
                .folders
                .items()
                .into_iter()
                .map(|folder| FolderRow {
                    note_count: notes.notes_in_folder(&folder.id).len(),
                    folder,
                })
                .collect();

            if json {
                let count = folders.len();
                return print_json(&FolderListOutput { folders, count });
            }
            if folders.is_empty() {
                println!("No folders.");
            }
            for row in &folders {
                println!(
                    "{} {} {}",
                    short_id(&row.folder.id).dimmed(),
                    row.folder.name.bold(),
                    format!("({} notes)", row.note_count).dimmed()
                );
            }
        }
        FolderCommands::Rm { id } => {
            let id = resolve_record_id(&notes.folders, id)?;
            let unfiled_notes = notes.notes_in_folder(&id).len();
            let outcome = notes.delete_folder(&id).await?;

            if json {
                return print_json(&FolderDeleteOutput {
                    id: &id,
                    unfiled_notes,
                    outcome,
                });
            }
            println!(
                "Deleted folder {} ({unfiled_notes} notes unfiled) [{}]",
                short_id(&id).dimmed(),
                outcome_label(&outcome)
            );
        }
    }
    Ok(())
}
