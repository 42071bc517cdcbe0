//! Applying one mutation to the remote.
//!
//! Used both for a repository's direct attempt and for queue replay, so a
//! mutation means the same thing whichever path delivers it. Outcomes that
//! show the remote already reflects the mutation count as success:
//! - create of an existing id
//! - update of a missing id
//! - delete of a missing id

use serde_json::Value;
use tracing::debug;

use crate::model::{CollectionSchema, Record, SyncOperation};
use crate::remote::{RemoteBackend, RemoteError, RemoteResult};

/// Apply `operation` for `record_id` to the remote, idempotently.
///
/// # Errors
///
/// Returns the remote error for anything other than the idempotent cases.
pub async fn apply_mutation<R: RemoteBackend>(
    remote: &R,
    schema: &CollectionSchema,
    operation: SyncOperation,
    record_id: &str,
    owner: &str,
    payload: &Value,
) -> RemoteResult<()> {
    let result = match operation {
        SyncOperation::Create => {
            let record = payload_object(payload)?;
            remote.insert(schema, record).await
        }
        SyncOperation::Update => {
            let fields = update_fields(schema, payload_object(payload)?);
            if fields.is_empty() {
                return Ok(());
            }
            remote.update(schema, record_id, owner, &fields).await
        }
        SyncOperation::Delete => remote.delete(schema, record_id, owner).await,
    };

    match result {
        Err(RemoteError::Conflict { .. }) if operation == SyncOperation::Create => {
            debug!(collection = schema.name, record_id, "Create already applied remotely");
            Ok(())
        }
        Err(RemoteError::NotFound { .. }) if operation != SyncOperation::Create => {
            debug!(
                collection = schema.name,
                record_id,
                operation = operation.as_str(),
                "Record absent remotely, treating as applied"
            );
            Ok(())
        }
        other => other,
    }
}

fn payload_object(payload: &Value) -> RemoteResult<&Record> {
    payload
        .as_object()
        .ok_or_else(|| RemoteError::Malformed(format!("queued payload is not an object: {payload}")))
}

/// Drop the id, owner, and creation timestamp from an update payload.
#[must_use]
pub fn update_fields(schema: &CollectionSchema, payload: &Record) -> Record {
    let immutable = schema.immutable_fields();
    payload
        .iter()
        .filter(|(key, _)| !immutable.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
