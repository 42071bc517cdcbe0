//! Per-invocation wiring: store, settings, remote, and connectivity.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::Cli;
use super::backend::CliBackend;
use super::output::short_id;
use crate::config::{FlowmateConfig, load_config, resolve_db_path, resolve_owner, resolve_remote};
use crate::error::{Error, Result};
use crate::model::Entity;
use crate::remote::{RemoteBackend, RestBackend};
use crate::repository::{NotesWorkspace, Repository};
use crate::storage::{SqliteStore, open_store};
use crate::sync::{Connectivity, SyncContext, SyncManager};
use crate::validate::{IdMatch, resolve_id};

/// Everything an owner-scoped command needs.
pub struct Workspace {
    pub db_path: PathBuf,
    pub store: Arc<SqliteStore>,
    pub config: FlowmateConfig,
    pub ctx: SyncContext<CliBackend>,
    owner_flag: Option<String>,
}

impl Workspace {
    /// Open an initialized store and probe the remote.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` if the store file does not exist yet,
    /// or a config/store error.
    pub async fn open(cli: &Cli) -> Result<Self> {
        let db_path = resolve_db_path(cli.db.as_deref()).ok_or(Error::NotInitialized)?;
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let store = open_store(&db_path)?;
        let config = load_config()?;

        let backend = match resolve_remote(&config) {
            Some(rest) if !cli.offline => CliBackend::Rest(RestBackend::new(rest)),
            _ => CliBackend::Unconfigured,
        };
        let online = backend.is_reachable().await;
        debug!(
            db = %db_path.display(),
            remote = backend.is_configured(),
            online,
            "Workspace opened"
        );

        let ctx = SyncContext::new(store.clone(), Arc::new(backend), Connectivity::new(online));
        Ok(Self {
            db_path,
            store,
            config,
            ctx,
            owner_flag: cli.owner.clone(),
        })
    }

    /// Resolved owner id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoOwner` if no owner is configured anywhere.
    pub fn owner(&self) -> Result<String> {
        resolve_owner(self.owner_flag.as_deref(), &self.config)
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.ctx.connectivity.is_online()
    }

    #[must_use]
    pub fn remote_configured(&self) -> bool {
        self.ctx.remote.is_configured()
    }

    /// A loaded repository for the owner.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoOwner` or a store error.
    pub async fn repository<T: Entity>(&self) -> Result<Repository<T, CliBackend>> {
        let repo = Repository::new(self.ctx.clone(), self.owner()?);
        repo.load().await?;
        Ok(repo)
    }

    /// A loaded notes workspace for the owner.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoOwner` or a store error.
    pub async fn notes(&self) -> Result<NotesWorkspace<CliBackend>> {
        let ws = NotesWorkspace::new(&self.ctx, &self.owner()?);
        ws.load().await?;
        Ok(ws)
    }

    /// Sync manager for the owner with the configured retention.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoOwner` if no owner is configured.
    pub fn manager(&self) -> Result<SyncManager<CliBackend>> {
        Ok(SyncManager::new(
            self.ctx.clone(),
            self.owner()?,
            self.config.retention(),
        ))
    }
}

/// Resolve a typed id (or unique prefix) against a repository's items.
///
/// # Errors
///
/// Returns `Error::RecordNotFound` / `RecordNotFoundSimilar` when nothing
/// matches and `Error::AmbiguousId` when the prefix is not unique.
pub fn resolve_record_id<T: Entity, R: RemoteBackend>(
    repo: &Repository<T, R>,
    input: &str,
) -> Result<String> {
    let ids: Vec<String> = repo.items().iter().map(|t| t.id().to_string()).collect();
    let collection = T::SCHEMA.name.to_string();

    match resolve_id(input, &ids) {
        IdMatch::Found(id) => Ok(id),
        IdMatch::Ambiguous(matches) => Err(Error::AmbiguousId {
            collection,
            prefix: input.to_string(),
            matches,
        }),
        IdMatch::Missing(similar) if similar.is_empty() => Err(Error::RecordNotFound {
            collection,
            id: input.to_string(),
        }),
        IdMatch::Missing(similar) => Err(Error::RecordNotFoundSimilar {
            collection,
            id: input.to_string(),
            similar: similar
                .iter()
                .map(|id| short_id(id).to_string())
                .collect(),
        }),
    }
}
