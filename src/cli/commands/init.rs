//! Initialize the offline store.
//!
//! Creates `~/.flowmate/data/offline.db` (or the `--db` / `FLOWMATE_DB`
//! path) with the full schema, and writes `~/.flowmate/config.json` the
//! first time so the owner and remote can be filled in.

use serde::Serialize;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::cli::output::print_json;
use crate::config::{FlowmateConfig, config_path, load_config_from, resolve_db_path, save_config_to};
use crate::error::{Error, Result};
use crate::storage::open_store;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    config: PathBuf,
    config_created: bool,
    migrations: Vec<String>,
}

/// Execute the init command.
///
/// Safe to run repeatedly: an existing store is migrated in place and an
/// existing config file is left alone.
///
/// # Errors
///
/// Returns an error if the store or config file cannot be created.
pub fn execute(cli: &Cli, json: bool) -> Result<()> {
    let db_path = resolve_db_path(cli.db.as_deref())
        .ok_or_else(|| Error::Config("Could not determine the store location".to_string()))?;

    let store = open_store(&db_path)?;
    let migrations = store.applied_migrations()?;

    let config = config_path()?;
    let config_created = !config.exists();
    if config_created {
        let initial = FlowmateConfig {
            owner_id: cli.owner.clone(),
            ..FlowmateConfig::default()
        };
        save_config_to(&config, &initial)?;
    } else {
        load_config_from(&config)?;
    }

    if json {
        return print_json(&InitOutput {
            database: db_path,
            config,
            config_created,
            migrations,
        });
    }

    println!("Initialized Flowmate offline store");
    println!("  Store:  {}", db_path.display());
    println!("  Config: {}", config.display());
    if config_created && cli.owner.is_none() {
        println!();
        println!("Next: set \"owner_id\" in the config file, or pass --owner.");
    }
    Ok(())
}
