//! Generic record shape and collection declarations.
//!
//! Every syncable collection stores schemaless JSON objects that share an
//! `id`, an owner field, and two timestamps. The typed entity structs in the
//! sibling modules are views over these records.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A raw collection record as stored locally and sent to the remote.
pub type Record = Map<String, Value>;

/// Declaration of one syncable collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSchema {
    /// Collection (and remote table) name.
    pub name: &'static str,
    /// Primary key field.
    pub id_field: &'static str,
    /// Owner scoping field.
    pub owner_field: &'static str,
    /// Fields that get a local expression index.
    pub indexed_fields: &'static [&'static str],
}

impl CollectionSchema {
    /// Read the primary key of a record, if it is a non-empty string.
    #[must_use]
    pub fn record_id<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record
            .get(self.id_field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Read the owner of a record, if it is a non-empty string.
    #[must_use]
    pub fn record_owner<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record
            .get(self.owner_field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Keys a patch may never touch.
    #[must_use]
    pub fn immutable_fields(&self) -> [&'static str; 3] {
        [self.id_field, self.owner_field, "created_at"]
    }
}

impl fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub const TASKS: CollectionSchema = CollectionSchema {
    name: "tasks",
    id_field: "id",
    owner_field: "user_id",
    indexed_fields: &["status", "quadrant"],
};

pub const DAILY_SYNCS: CollectionSchema = CollectionSchema {
    name: "daily_syncs",
    id_field: "id",
    owner_field: "user_id",
    indexed_fields: &["sync_date"],
};

pub const NOTES: CollectionSchema = CollectionSchema {
    name: "notes",
    id_field: "id",
    owner_field: "user_id",
    indexed_fields: &["folder_id"],
};

pub const FOLDERS: CollectionSchema = CollectionSchema {
    name: "folders",
    id_field: "id",
    owner_field: "user_id",
    indexed_fields: &[],
};

pub const KNOWLEDGE_ITEMS: CollectionSchema = CollectionSchema {
    name: "knowledge_items",
    id_field: "id",
    owner_field: "user_id",
    indexed_fields: &["note_id"],
};

/// Every collection the local store knows about.
pub const COLLECTIONS: &[&CollectionSchema] =
    &[&TASKS, &DAILY_SYNCS, &NOTES, &FOLDERS, &KNOWLEDGE_ITEMS];

/// Look up a collection declaration by name.
///
/// # Errors
///
/// Returns `Error::UnknownCollection` for names that were never declared.
pub fn schema_for(name: &str) -> Result<&'static CollectionSchema> {
    COLLECTIONS
        .iter()
        .copied()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::UnknownCollection(name.to_string()))
}

/// A typed view over one collection.
///
/// Implementors deserialize from the stored record, validate their own
/// invariants, and define the order the repository publishes them in.
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// The collection this entity lives in.
    const SCHEMA: &'static CollectionSchema;

    /// Client-generated primary key.
    fn id(&self) -> &str;

    /// Check field-level invariants before any write.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` describing the first violated rule.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Display order for published collections.
    fn ordering(a: &Self, b: &Self) -> Ordering;

    /// Convert a stored record into the entity.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` when the record does not match the shape.
    fn from_record(record: &Record) -> Result<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| Error::invalid_record(Self::SCHEMA.name, e.to_string()))
    }

    /// Convert the entity back into a storable record.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not serialize to a JSON object.
    fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::invalid_record(
                Self::SCHEMA.name,
                format!("expected an object, got {other}"),
            )),
        }
    }
}

/// Serialize any draft or patch into a JSON object.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` when the value is not a JSON object.
pub fn to_object<P: Serialize + ?Sized>(value: &P) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::InvalidArgument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
#[must_use]
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
