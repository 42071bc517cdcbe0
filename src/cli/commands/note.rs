//! Note command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::cli::NoteCommands;
use crate::cli::output::{outcome_label, print_json, short_id, truncate};
use crate::cli::workspace::{Workspace, resolve_record_id};
use crate::error::{Error, Result};
use crate::model::{NewNote, Note, NotePatch};

#[derive(Serialize)]
struct NoteListOutput {
    notes: Vec<Note>,
    count: usize,
}

/// Execute note commands.
///
/// # Errors
///
/// Returns an error for unknown ids or store failures.
pub async fn execute(command: &NoteCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        NoteCommands::Add {
            title,
            content,
            folder,
        } => add(ws, title, content, folder.as_deref(), json).await,
        NoteCommands::List { folder } => list(ws, folder.as_deref(), json).await,
        NoteCommands::Update {
            id,
            title,
            content,
            folder,
            unfile,
        } => {
            update(
                ws,
                id,
                title.as_deref(),
                content.as_deref(),
                folder.as_deref(),
                *unfile,
                json,
            )
            .await
        }
        NoteCommands::Rm { id } => remove(ws, id, json).await,
    }
}

async fn add(
    ws: &Workspace,
    title: &str,
    content: &str,
    folder: Option<&str>,
    json: bool,
) -> Result<()> {
    let notes = ws.notes().await?;
    let folder_id = folder
        .map(|f| resolve_record_id(&notes.folders, f))
        .transpose()?;

    let draft = NewNote {
        title: title.to_string(),
        content: content.to_string(),
        ai_generated_content: None,
        folder_id,
    };
    let mutation = notes.create_note(&draft).await?;

    if json {
        return print_json(&mutation);
    }
    println!(
        "Added note {} {} [{}]",
        short_id(&mutation.record.id).dimmed(),
        mutation.record.title.bold(),
        outcome_label(&mutation.outcome)
    );
    Ok(())
}

async fn list(ws: &Workspace, folder: Option<&str>, json: bool) -> Result<()> {
    let notes = ws.notes().await?;
    let items = match folder {
        Some(f) => {
            let folder_id = resolve_record_id(&notes.folders, f)?;
            notes.notes_in_folder(&folder_id)
        }
        None => notes.notes.items(),
    };

    if json {
        let count = items.len();
        return print_json(&NoteListOutput {
            notes: items,
            count,
        });
    }

    if items.is_empty() {
        println!("No notes.");
        return Ok(());
    }
    for note in &items {
        let folder = note
            .folder_id
            .as_deref()
            .and_then(|id| notes.folders.get(id))
            .map(|f| format!(" [{}]", f.name))
            .unwrap_or_default();
        println!(
            "{} {}{}",
            short_id(&note.id).dimmed(),
            note.title.bold(),
            folder.dimmed()
        );
        if !note.content.is_empty() {
            println!("    {}", truncate(&note.content, 72));
        }
    }
    Ok(())
}

async fn update(
    ws: &Workspace,
    id: &str,
    title: Option<&str>,
    content: Option<&str>,
    folder: Option<&str>,
    unfile: bool,
    json: bool,
) -> Result<()> {
    let notes = ws.notes().await?;
    let id = resolve_record_id(&notes.notes, id)?;

    let folder_id = if unfile {
        Some(None)
    } else {
        folder
            .map(|f| resolve_record_id(&notes.folders, f))
            .transpose()?
            .map(Some)
    };
    let patch = NotePatch {
        title: title.map(str::to_string),
        content: content.map(str::to_string),
        ai_generated_content: None,
        folder_id,
    };
    if patch.title.is_none() && patch.content.is_none() && patch.folder_id.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to update: pass at least one field".to_string(),
        ));
    }

    let mutation = notes.update_note(&id, &patch).await?;
    if json {
        return print_json(&mutation);
    }
    println!(
        "Updated note {} {} [{}]",
        short_id(&id).dimmed(),
        mutation.record.title.bold(),
        outcome_label(&mutation.outcome)
    );
    Ok(())
}

async fn remove(ws: &Workspace, id: &str, json: bool) -> Result<()> {
    let notes = ws.notes().await?;
    let id = resolve_record_id(&notes.notes, id)?;
    let outcome = notes.delete_note(&id).await?;

    if json {
        return print_json(&serde_json::json!({ "id": id, "outcome": outcome }));
    }
    println!("Deleted note {} [{}]", short_id(&id).dimmed(), outcome_label(&outcome));
    Ok(())
}
