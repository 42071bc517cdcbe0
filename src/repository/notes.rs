//! Notes and the folders that group them.

use tracing::debug;

use super::{Mutation, Repository};
use crate::error::{Error, Result};
use crate::model::{Folder, NewFolder, NewNote, Note, NotePatch};
use crate::remote::RemoteBackend;
use crate::sync::{SyncContext, WriteOutcome};

/// Notes plus folders for one owner.
pub struct NotesWorkspace<R: RemoteBackend> {
    pub notes: Repository<Note, R>,
    pub folders: Repository<Folder, R>,
}

impl<R: RemoteBackend> NotesWorkspace<R> {
    #[must_use]
    pub fn new(ctx: &SyncContext<R>, owner: &str) -> Self {
        Self {
            notes: Repository::new(ctx.clone(), owner),
            folders: Repository::new(ctx.clone(), owner),
        }
    }

    /// Load folders, then notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store fails.
    pub async fn load(&self) -> Result<()> {
        self.folders.load().await?;
        self.notes.load().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` if `parent_id` names no folder.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Mutation<Folder>> {
        if let Some(parent) = parent_id {
            self.require_folder(parent)?;
        }
        let draft = NewFolder {
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        };
        self.folders.add(&draft).await
    }

    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` if the note is filed into a missing
    /// folder.
    pub async fn create_note(&self, draft: &NewNote) -> Result<Mutation<Note>> {
        if let Some(folder) = draft.folder_id.as_deref() {
            self.require_folder(folder)?;
        }
        self.notes.add(draft).await
    }

    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` for an unknown note or target folder.
    pub async fn update_note(&self, id: &str, patch: &NotePatch) -> Result<Mutation<Note>> {
        if let Some(Some(folder)) = patch.folder_id.as_ref() {
            self.require_folder(folder)?;
        }
        self.notes.update(id, patch).await
    }

    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` for an unknown note.
    pub async fn delete_note(&self, id: &str) -> Result<WriteOutcome> {
        self.notes.delete(id).await
    }

    /// Delete a folder after moving its notes out of it.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` for an unknown folder.
    pub async fn delete_folder(&self, id: &str) -> Result<WriteOutcome> {
        self.require_folder(id)?;

        let children = self.notes_in_folder(id);
        for note in &children {
            self.notes.update(&note.id, &NotePatch::unfile()).await?;
        }
        debug!(folder = id, unfiled = children.len(), "Unfiled notes before folder delete");

        self.folders.delete(id).await
    }

    #[must_use]
    pub fn notes_in_folder(&self, folder_id: &str) -> Vec<Note> {
        self.notes
            .items()
            .into_iter()
            .filter(|n| n.folder_id.as_deref() == Some(folder_id))
            .collect()
    }

    fn require_folder(&self, id: &str) -> Result<Folder> {
        self.folders.get(id).ok_or_else(|| Error::RecordNotFound {
            collection: "folders".to_string(),
            id: id.to_string(),
        })
    }
}
