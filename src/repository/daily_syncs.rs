//! Daily check-ins: at most one per owner and date.

use super::{Mutation, Repository};
use crate::error::Result;
use crate::model::{DailySync, DailySyncPatch, NewDailySync};
use crate::remote::RemoteBackend;

impl<R: RemoteBackend> Repository<DailySync, R> {
    /// Save the check-in for `date`, updating it if one already exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` for an energy level outside 1-5 or a
    /// date not in `YYYY-MM-DD` form.
    pub async fn save_today(
        &self,
        date: &str,
        energy_level: u8,
        reflection: Option<String>,
    ) -> Result<Mutation<DailySync>> {
        match self.for_date(date) {
            Some(existing) => {
                let patch = DailySyncPatch {
                    energy_level: Some(energy_level),
                    reflection: Some(reflection),
                };
                self.update(&existing.id, &patch).await
            }
            None => {
                let draft = NewDailySync {
                    energy_level,
                    reflection,
                    sync_date: date.to_string(),
                };
                self.add(&draft).await
            }
        }
    }

    #[must_use]
    pub fn for_date(&self, date: &str) -> Option<DailySync> {
        self.items().into_iter().find(|s| s.sync_date == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::MemoryBackend;
    use crate::storage::SqliteStore;
    use crate::sync::{Connectivity, SyncContext};
    use std::sync::Arc;

    fn repo() -> Repository<DailySync, MemoryBackend> {
        let ctx = SyncContext::new(
            Arc::new(SqliteStore::open_memory().unwrap()),
            Arc::new(MemoryBackend::new()),
            Connectivity::new(true),
        );
        Repository::new(ctx, "u1")
    }

    #[tokio::test]
    async fn test_save_today_creates_then_updates() {
        let repo = repo();
        let first = repo
            .save_today("2025-02-01", 2, Some("slow start".into()))
            .await
            .unwrap();
        let second = repo.save_today("2025-02-01", 4, None).await.unwrap();

        assert_eq!(first.record.id, second.record.id);
        assert_eq!(repo.items().len(), 1);
        let saved = repo.for_date("2025-02-01").unwrap();
        assert_eq!(saved.energy_level, 4);
        assert_eq!(saved.reflection, None);
    }

    #[tokio::test]
    async fn test_separate_days_are_separate_entries() {
        let repo = repo();
        repo.save_today("2025-01-31", 3, None).await.unwrap();
        repo.save_today("2025-02-01", 5, None).await.unwrap();

        let dates: Vec<_> = repo.items().into_iter().map(|s| s.sync_date).collect();
        assert_eq!(dates, ["2025-02-01", "2025-01-31"]);
        assert!(repo.for_date("2025-01-30").is_none());
    }

    #[tokio::test]
    async fn test_invalid_energy_rejected() {
        assert!(matches!(
            repo().save_today("2025-02-01", 6, None).await,
            Err(Error::InvalidRecord { .. })
        ));
    }
}
