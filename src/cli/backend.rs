//! Remote backend selection for the CLI.

use crate::model::{CollectionSchema, Record};
use crate::remote::{RemoteBackend, RemoteError, RemoteResult, RestBackend};

/// The remote the CLI talks to.
///
/// `Unconfigured` is used when no remote is set up or `--offline` is given;
/// the CLI then keeps connectivity off, so every write is queued.
pub enum CliBackend {
    Rest(RestBackend),
    Unconfigured,
}

fn unconfigured() -> RemoteError {
    RemoteError::Unreachable("no remote configured".to_string())
}

impl CliBackend {
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Rest(_))
    }
}

impl RemoteBackend for CliBackend {
    async fn insert(&self, schema: &CollectionSchema, record: &Record) -> RemoteResult<()> {
        match self {
            Self::Rest(rest) => rest.insert(schema, record).await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }

    async fn update(
        &self,
        schema: &CollectionSchema,
        id: &str,
        owner: &str,
        fields: &Record,
    ) -> RemoteResult<()> {
        match self {
            Self::Rest(rest) => rest.update(schema, id, owner, fields).await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }

    async fn delete(&self, schema: &CollectionSchema, id: &str, owner: &str) -> RemoteResult<()> {
        match self {
            Self::Rest(rest) => rest.delete(schema, id, owner).await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }

    async fn select_all(&self, schema: &CollectionSchema, owner: &str) -> RemoteResult<Vec<Record>> {
        match self {
            Self::Rest(rest) => rest.select_all(schema, owner).await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }

    async fn is_reachable(&self) -> bool {
        match self {
            Self::Rest(rest) => rest.is_reachable().await,
            Self::Unconfigured => false,
        }
    }
}
