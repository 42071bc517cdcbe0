//! Knowledge captures attached to notes.

use super::{Mutation, Repository};
use crate::error::Result;
use crate::model::{KnowledgeItem, NewKnowledgeItem};
use crate::remote::RemoteBackend;
use crate::sync::WriteOutcome;

impl<R: RemoteBackend> Repository<KnowledgeItem, R> {
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` for a web link without a URL.
    pub async fn add_item(&self, draft: &NewKnowledgeItem) -> Result<Mutation<KnowledgeItem>> {
        self.add(draft).await
    }

    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` for an unknown item.
    pub async fn delete_item(&self, id: &str) -> Result<WriteOutcome> {
        self.delete(id).await
    }

    #[must_use]
    pub fn for_note(&self, note_id: &str) -> Vec<KnowledgeItem> {
        self.items()
            .into_iter()
            .filter(|k| k.note_id.as_deref() == Some(note_id))
            .collect()
    }
}
