//! Knowledge item model.
//!
//! Captured material (pasted text, PDFs, images, recordings, links) that can
//! be attached to a note. File upload and text extraction happen elsewhere;
//! this model only carries the resulting URLs and text.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{CollectionSchema, Entity, KNOWLEDGE_ITEMS};
use crate::error::{Error, Result};

/// Kind of captured material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeItemType {
    Text,
    Pdf,
    Image,
    Audio,
    WebLink,
}

impl KnowledgeItemType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::WebLink => "web_link",
        }
    }
}

/// A knowledge item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,

    pub user_id: String,

    pub item_type: KnowledgeItemType,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    /// Text pulled out of a PDF or transcript
    #[serde(default)]
    pub extracted_text: Option<String>,

    /// Storage URL of an uploaded file
    #[serde(default)]
    pub file_url: Option<String>,

    /// Source URL for web links
    #[serde(default)]
    pub original_url: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub metadata: Map<String, Value>,

    #[serde(default)]
    pub note_id: Option<String>,

    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub updated_at: String,
}

/// Fields supplied when capturing a knowledge item.
#[derive(Debug, Clone, Serialize)]
pub struct NewKnowledgeItem {
    pub item_type: KnowledgeItemType,
    pub title: Option<String>,
    pub content: Option<String>,
    pub extracted_text: Option<String>,
    pub file_url: Option<String>,
    pub original_url: Option<String>,
    pub metadata: Map<String, Value>,
    pub note_id: Option<String>,
}

impl NewKnowledgeItem {
    /// A plain text capture.
    #[must_use]
    pub fn text(title: Option<String>, content: String, note_id: Option<String>) -> Self {
        Self {
            item_type: KnowledgeItemType::Text,
            title,
            content: Some(content),
            extracted_text: None,
            file_url: None,
            original_url: None,
            metadata: Map::new(),
            note_id,
        }
    }
}

impl Entity for KnowledgeItem {
    const SCHEMA: &'static CollectionSchema = &KNOWLEDGE_ITEMS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.item_type == KnowledgeItemType::WebLink && self.original_url.is_none() {
            return Err(Error::invalid_record(
                KNOWLEDGE_ITEMS.name,
                "web_link items need an original_url",
            ));
        }
        Ok(())
    }

    /// Newest capture first.
    fn ordering(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at)
    }
}

fn null_as_empty_map<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_with_null_metadata() {
        let item: KnowledgeItem = serde_json::from_value(json!({
            "id": "k1",
            "user_id": "u1",
            "item_type": "web_link",
            "original_url": "https://example.org",
            "metadata": null
        }))
        .unwrap();
        assert_eq!(item.item_type, KnowledgeItemType::WebLink);
        assert!(item.metadata.is_empty());
        assert!(item.validate().is_ok());
    }

    #[test]
    fn test_web_link_requires_url() {
        let item: KnowledgeItem = serde_json::from_value(json!({
            "id": "k1", "user_id": "u1", "item_type": "web_link"
        }))
        .unwrap();
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_unknown_item_type_rejected() {
        let result: std::result::Result<KnowledgeItem, _> = serde_json::from_value(json!({
            "id": "k1", "user_id": "u1", "item_type": "video"
        }));
        assert!(result.is_err());
    }
}
