//! Note and folder models.
//!
//! Notes optionally belong to a folder. The reference is soft: a note whose
//! folder no longer exists is shown as unfiled.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::record::{CollectionSchema, Entity, FOLDERS, NOTES};
use crate::error::{Error, Result};

/// A note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,

    pub user_id: String,

    pub title: String,

    #[serde(default)]
    pub content: String,

    /// Output of the AI assistant, if any
    #[serde(default)]
    pub ai_generated_content: Option<String>,

    #[serde(default)]
    pub folder_id: Option<String>,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,
}

/// Fields supplied when creating a note.
#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub ai_generated_content: Option<String>,
    pub folder_id: Option<String>,
}

/// Partial update for a note.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_generated_content: Option<Option<String>>,
    /// `Some(None)` moves the note out of its folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Option<String>>,
}

impl NotePatch {
    /// Patch that detaches a note from its folder.
    #[must_use]
    pub fn unfile() -> Self {
        Self {
            folder_id: Some(None),
            ..Self::default()
        }
    }
}

impl Entity for Note {
    const SCHEMA: &'static CollectionSchema = &NOTES;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid_record(NOTES.name, "title must not be empty"));
        }
        Ok(())
    }

    /// Most recently edited first.
    fn ordering(a: &Self, b: &Self) -> Ordering {
        b.updated_at.cmp(&a.updated_at)
    }
}

/// A folder grouping notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,

    pub user_id: String,

    pub name: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,
}

/// Fields supplied when creating a folder.
#[derive(Debug, Clone, Serialize)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<String>,
}

impl Entity for Folder {
    const SCHEMA: &'static CollectionSchema = &FOLDERS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_record(FOLDERS.name, "name must not be empty"));
        }
        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(Error::invalid_record(FOLDERS.name, "folder cannot be its own parent"));
        }
        Ok(())
    }

    fn ordering(a: &Self, b: &Self) -> Ordering {
        a.name.to_lowercase().cmp(&b.name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_ordering_most_recent_first() {
        let older: Note = serde_json::from_value(json!({
            "id": "n1", "user_id": "u1", "title": "Old",
            "updated_at": "2025-01-01T00:00:00.000Z"
        }))
        .unwrap();
        let newer = Note {
            id: "n2".into(),
            title: "New".into(),
            updated_at: "2025-02-01T00:00:00.000Z".into(),
            ..older.clone()
        };
        assert_eq!(Note::ordering(&newer, &older), Ordering::Less);
    }

    #[test]
    fn test_folder_ordering_is_case_insensitive() {
        let folder = |name: &str| Folder {
            id: name.into(),
            user_id: "u1".into(),
            name: name.into(),
            parent_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let mut folders = vec![folder("work"), folder("Archive"), folder("ideas")];
        folders.sort_by(Folder::ordering);
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Archive", "ideas", "work"]);
    }

    #[test]
    fn test_unfile_patch_sets_null_folder() {
        assert_eq!(
            serde_json::to_value(NotePatch::unfile()).unwrap(),
            json!({"folder_id": null})
        );
    }

    #[test]
    fn test_note_requires_title() {
        let note: Note = serde_json::from_value(json!({
            "id": "n1", "user_id": "u1", "title": " "
        }))
        .unwrap();
        assert!(note.validate().is_err());
    }
}
