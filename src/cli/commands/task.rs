//! Task command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::cli::TaskCommands;
use crate::cli::output::{outcome_label, print_json, rejected, short_id, sync_marker, truncate};
use crate::cli::workspace::{Workspace, resolve_record_id};
use crate::error::{Error, Result};
use crate::model::{NewTask, Quadrant, Task, TaskPatch, TaskStatus};
use crate::sync::RecordSyncStatus;
use crate::validate::{normalize_energy, normalize_quadrant, normalize_status};

#[derive(Serialize)]
struct TaskListOutput {
    tasks: Vec<TaskRow>,
    count: usize,
}

#[derive(Serialize)]
struct TaskRow {
    #[serde(flatten)]
    task: Task,
    sync_status: RecordSyncStatus,
}

#[derive(Serialize)]
struct FixMissedOutput {
    rescheduled: usize,
}

/// Execute task commands.
///
/// # Errors
///
/// Returns an error for bad input, unknown ids, or store failures.
pub async fn execute(command: &TaskCommands, ws: &Workspace, json: bool) -> Result<()> {
    match command {
        TaskCommands::Add {
            title,
            quadrant,
            energy,
            duration,
            due,
        } => {
            let draft = NewTask {
                title: title.clone(),
                quadrant: normalize_quadrant(quadrant).map_err(|r| rejected("quadrant", r))?,
                energy: normalize_energy(energy).map_err(|r| rejected("energy", r))?,
                duration: *duration,
                status: TaskStatus::Pending,
                due: due.clone().unwrap_or_default(),
            };
            add(ws, &draft, json).await
        }
        TaskCommands::List { quadrant, status } => {
            let quadrant = quadrant
                .as_deref()
                .map(normalize_quadrant)
                .transpose()
                .map_err(|r| rejected("quadrant", r))?;
            let status = status
                .as_deref()
                .map(normalize_status)
                .transpose()
                .map_err(|r| rejected("status", r))?;
            list(ws, quadrant, status, json).await
        }
        TaskCommands::Update {
            id,
            title,
            quadrant,
            energy,
            duration,
            status,
            due,
        } => {
            let patch = TaskPatch {
                title: title.clone(),
                quadrant: quadrant
                    .as_deref()
                    .map(normalize_quadrant)
                    .transpose()
                    .map_err(|r| rejected("quadrant", r))?,
                energy: energy
                    .as_deref()
                    .map(normalize_energy)
                    .transpose()
                    .map_err(|r| rejected("energy", r))?,
                duration: *duration,
                status: status
                    .as_deref()
                    .map(normalize_status)
                    .transpose()
                    .map_err(|r| rejected("status", r))?,
                due: due.clone(),
            };
            update(ws, id, &patch, json).await
        }
        TaskCommands::Done { id } => done(ws, id, json).await,
        TaskCommands::FixMissed => fix_missed(ws, json).await,
        TaskCommands::Rm { id } => remove(ws, id, json).await,
    }
}

async fn add(ws: &Workspace, draft: &NewTask, json: bool) -> Result<()> {
    let repo = ws.repository::<Task>().await?;
    let mutation = repo.add(draft).await?;

    if json {
        return print_json(&mutation);
    }
    println!(
        "Added task {} {} [{}]",
        short_id(&mutation.record.id).dimmed(),
        mutation.record.title.bold(),
        outcome_label(&mutation.outcome)
    );
    Ok(())
}

async fn list(
    ws: &Workspace,
    quadrant: Option<Quadrant>,
    status: Option<TaskStatus>,
    json: bool,
) -> Result<()> {
    let repo = ws.repository::<Task>().await?;
    let manager = ws.manager()?;

    let tasks: Vec<Task> = match quadrant {
        Some(q) => repo.by_quadrant(q),
        None => repo.items(),
    }
    .into_iter()
    .filter(|t| status.is_none_or(|s| t.status == s))
    .collect();

    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        let sync_status = manager.status_of("tasks", &task.id)?;
        rows.push(TaskRow { task, sync_status });
    }

    if json {
        let count = rows.len();
        return print_json(&TaskListOutput { tasks: rows, count });
    }

    if rows.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    for quadrant in Quadrant::ALL {
        let group: Vec<&TaskRow> = rows.iter().filter(|r| r.task.quadrant == quadrant).collect();
        if group.is_empty() {
            continue;
        }
        println!("{}", quadrant.as_str().cyan().bold());
        for row in group {
            let task = &row.task;
            let check = match task.status {
                TaskStatus::Completed => "[x]".green(),
                TaskStatus::Missed => "[!]".red(),
                TaskStatus::Pending => "[ ]".normal(),
            };
            let due = if task.due.is_empty() {
                String::new()
            } else {
                format!(" due {}", task.due)
            };
            println!(
                " {}{} {} {} {}",
                sync_marker(row.sync_status),
                check,
                short_id(&task.id).dimmed(),
                truncate(&task.title, 60),
                format!("e{} {}m{due}", task.energy, task.duration).dimmed()
            );
        }
    }
    Ok(())
}

async fn update(ws: &Workspace, id: &str, patch: &TaskPatch, json: bool) -> Result<()> {
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update: pass at least one field".to_string(),
        ));
    }
    let repo = ws.repository::<Task>().await?;
    let id = resolve_record_id(&repo, id)?;
    let mutation = repo.update(&id, patch).await?;

    if json {
        return print_json(&mutation);
    }
    println!(
        "Updated task {} {} [{}]",
        short_id(&id).dimmed(),
        mutation.record.title.bold(),
        outcome_label(&mutation.outcome)
    );
    Ok(())
}

async fn done(ws: &Workspace, id: &str, json: bool) -> Result<()> {
    let repo = ws.repository::<Task>().await?;
    let id = resolve_record_id(&repo, id)?;
    let mutation = repo.toggle_complete(&id).await?;

    if json {
        return print_json(&mutation);
    }
    println!(
        "Task {} is now {} [{}]",
        mutation.record.title.bold(),
        mutation.record.status,
        outcome_label(&mutation.outcome)
    );
    Ok(())
}

async fn fix_missed(ws: &Workspace, json: bool) -> Result<()> {
    let repo = ws.repository::<Task>().await?;
    let rescheduled = repo.auto_fix_missed().await?;

    if json {
        return print_json(&FixMissedOutput { rescheduled });
    }
    if rescheduled == 0 {
        println!("No missed tasks.");
    } else {
        println!("Rescheduled {rescheduled} missed task(s) for tomorrow");
    }
    Ok(())
}

async fn remove(ws: &Workspace, id: &str, json: bool) -> Result<()> {
    let repo = ws.repository::<Task>().await?;
    let id = resolve_record_id(&repo, id)?;
    let outcome = repo.delete(&id).await?;

    if json {
        return print_json(&serde_json::json!({ "id": id, "outcome": outcome }));
    }
    println!("Deleted task {} [{}]", short_id(&id).dimmed(), outcome_label(&outcome));
    Ok(())
}
