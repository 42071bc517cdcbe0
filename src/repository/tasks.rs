//! Task board operations.

use tracing::info;

use super::{Mutation, Repository};
use crate::error::Result;
use crate::model::{Entity, Quadrant, Task, TaskPatch, TaskStatus};
use crate::remote::RemoteBackend;

/// Due text given to tasks rescued from `missed`.
pub const RESCHEDULED_DUE: &str = "Tomorrow";

impl<R: RemoteBackend> Repository<Task, R> {
    /// Flip a task between `completed` and `pending`.
    ///
    /// A `missed` task toggles to `completed`. The new status is on the
    /// returned record.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` for an unknown id.
    pub async fn toggle_complete(&self, id: &str) -> Result<Mutation<Task>> {
        let task = Task::from_record(&self.current_record(id)?)?;
        let patch = TaskPatch {
            status: Some(task.status.toggled()),
            ..Default::default()
        };
        self.update(id, &patch).await
    }

    /// Move every missed task back to `pending`, due tomorrow.
    ///
    /// Returns how many tasks were rescheduled.
    ///
    /// # Errors
    ///
    /// Stops at the first failed local write.
    pub async fn auto_fix_missed(&self) -> Result<usize> {
        let missed = self.missed();
        for task in &missed {
            let patch = TaskPatch {
                status: Some(TaskStatus::Pending),
                due: Some(RESCHEDULED_DUE.to_string()),
                ..Default::default()
            };
            self.update(&task.id, &patch).await?;
        }
        if !missed.is_empty() {
            info!(count = missed.len(), "Rescheduled missed tasks");
        }
        Ok(missed.len())
    }

    #[must_use]
    pub fn by_quadrant(&self, quadrant: Quadrant) -> Vec<Task> {
        self.items()
            .into_iter()
            .filter(|t| t.quadrant == quadrant)
            .collect()
    }

    #[must_use]
    pub fn missed(&self) -> Vec<Task> {
        self.items()
            .into_iter()
            .filter(|t| t.status == TaskStatus::Missed)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::NewTask;
    use crate::remote::MemoryBackend;
    use crate::storage::SqliteStore;
    use crate::sync::{Connectivity, SyncContext};
    use std::sync::Arc;

    fn repo() -> Repository<Task, MemoryBackend> {
        let ctx = SyncContext::new(
            Arc::new(SqliteStore::open_memory().unwrap()),
            Arc::new(MemoryBackend::new()),
            Connectivity::new(true),
        );
        Repository::new(ctx, "u1")
    }

    fn draft(title: &str, quadrant: Quadrant, status: TaskStatus, due: &str) -> NewTask {
        NewTask {
            title: title.into(),
            quadrant,
            energy: 3,
            duration: 30,
            status,
            due: due.into(),
        }
    }

    #[tokio::test]
    async fn test_toggle_complete_round_trip() {
        let repo = repo();
        let m = repo
            .add(&draft("a", Quadrant::Do, TaskStatus::Pending, ""))
            .await
            .unwrap();

        let done = repo.toggle_complete(&m.record.id).await.unwrap();
        assert_eq!(done.record.status, TaskStatus::Completed);
        let back = repo.toggle_complete(&m.record.id).await.unwrap();
        assert_eq!(back.record.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_toggle_missed_completes() {
        let repo = repo();
        let m = repo
            .add(&draft("a", Quadrant::Do, TaskStatus::Missed, ""))
            .await
            .unwrap();
        let done = repo.toggle_complete(&m.record.id).await.unwrap();
        assert_eq!(done.record.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_toggle_reads_store_before_load() {
        let writer = repo();
        let m = writer
            .add(&draft("a", Quadrant::Do, TaskStatus::Pending, ""))
            .await
            .unwrap();

        let fresh: Repository<Task, MemoryBackend> =
            Repository::new(writer.ctx.clone(), "u1");
        assert!(fresh.items().is_empty());
        let done = fresh.toggle_complete(&m.record.id).await.unwrap();
        assert_eq!(done.record.status, TaskStatus::Completed);
        assert_eq!(done.record.title, "a");
    }

    #[tokio::test]
    async fn test_toggle_unknown_task() {
        assert!(matches!(
            repo().toggle_complete("nope").await,
            Err(Error::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_auto_fix_missed() {
        let repo = repo();
        repo.add(&draft("late", Quadrant::Do, TaskStatus::Missed, "Feb 1, 2025"))
            .await
            .unwrap();
        repo.add(&draft("fine", Quadrant::Do, TaskStatus::Pending, ""))
            .await
            .unwrap();

        assert_eq!(repo.auto_fix_missed().await.unwrap(), 1);
        assert!(repo.missed().is_empty());
        let late = repo.items().into_iter().find(|t| t.title == "late").unwrap();
        assert_eq!(late.status, TaskStatus::Pending);
        assert_eq!(late.due, RESCHEDULED_DUE);

        assert_eq!(repo.auto_fix_missed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_by_quadrant_and_due_ordering() {
        let repo = repo();
        repo.add(&draft("later", Quadrant::Schedule, TaskStatus::Pending, "2031-03-01"))
            .await
            .unwrap();
        repo.add(&draft("sooner", Quadrant::Schedule, TaskStatus::Pending, "Feb 4, 2030 at 10:30 AM"))
            .await
            .unwrap();
        repo.add(&draft("someday", Quadrant::Schedule, TaskStatus::Pending, "whenever"))
            .await
            .unwrap();
        repo.add(&draft("other", Quadrant::Eliminate, TaskStatus::Pending, ""))
            .await
            .unwrap();

        let titles: Vec<_> = repo
            .by_quadrant(Quadrant::Schedule)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["sooner", "later", "someday"]);
        assert_eq!(repo.by_quadrant(Quadrant::Delegate).len(), 0);
    }
}
