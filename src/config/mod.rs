//! Configuration management.
//!
//! Everything lives under `~/.flowmate/`:
//! - **Store**: `~/.flowmate/data/offline.db`
//! - **Settings**: `~/.flowmate/config.json` (owner, retention, remote)
//!
//! Environment variables override the settings file, and CLI flags override
//! both.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::RestConfig;
use crate::sync::DEFAULT_RETENTION_HOURS;

/// Remote connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Contents of `~/.flowmate/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowmateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// How long synced queue entries are kept before pruning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_hours: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,
}

impl FlowmateConfig {
    /// Retention window for synced queue entries.
    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        let hours = self
            .retention_hours
            .filter(|h| *h >= 0)
            .unwrap_or(DEFAULT_RETENTION_HOURS);
        chrono::Duration::hours(hours)
    }
}

/// The global `~/.flowmate/` directory.
#[must_use]
pub fn global_flowmate_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".flowmate"))
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the store path.
///
/// Priority:
/// 1. `explicit_path` (the `--db` flag)
/// 2. `FLOWMATE_DB` environment variable
/// 3. `~/.flowmate/data/offline.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(db_path) = env_nonempty("FLOWMATE_DB") {
        return Some(PathBuf::from(db_path));
    }

    global_flowmate_dir().map(|dir| dir.join("data").join("offline.db"))
}

/// Path of the settings file.
///
/// # Errors
///
/// Returns `Error::Config` when no home directory can be found.
pub fn config_path() -> Result<PathBuf> {
    global_flowmate_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the settings file, or defaults if it does not exist.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<FlowmateConfig> {
    load_config_from(&config_path()?)
}

/// Load settings from a specific file.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<FlowmateConfig> {
    if !path.exists() {
        return Ok(FlowmateConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the settings file.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be written.
pub fn save_config(config: &FlowmateConfig) -> Result<()> {
    save_config_to(&config_path()?, config)
}

/// Save settings to a specific file, creating parent directories.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be written.
pub fn save_config_to(path: &Path, config: &FlowmateConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}

/// Resolve the owner id for every owner-scoped command.
///
/// Priority:
/// 1. Explicit `--owner` flag
/// 2. `FLOWMATE_OWNER` environment variable
/// 3. `owner_id` in the settings file
/// 4. **Error**, never a guess
///
/// # Errors
///
/// Returns `Error::NoOwner` when none of the sources name an owner.
pub fn resolve_owner(explicit: Option<&str>, config: &FlowmateConfig) -> Result<String> {
    pick_owner(explicit, env_nonempty("FLOWMATE_OWNER"), config)
}

fn pick_owner(explicit: Option<&str>, env: Option<String>, config: &FlowmateConfig) -> Result<String> {
    explicit
        .filter(|o| !o.trim().is_empty())
        .map(str::to_string)
        .or(env)
        .or_else(|| config.owner_id.clone().filter(|o| !o.trim().is_empty()))
        .ok_or(Error::NoOwner)
}

/// Resolve the remote connection, if one is configured.
///
/// `FLOWMATE_REMOTE_URL`, `FLOWMATE_API_KEY`, and `FLOWMATE_ACCESS_TOKEN`
/// override the settings file. Returns `None` unless both a URL and an API
/// key are known.
#[must_use]
pub fn resolve_remote(config: &FlowmateConfig) -> Option<RestConfig> {
    let env = RemoteSettings {
        url: env_nonempty("FLOWMATE_REMOTE_URL"),
        api_key: env_nonempty("FLOWMATE_API_KEY"),
        access_token: env_nonempty("FLOWMATE_ACCESS_TOKEN"),
    };
    merge_remote(env, config.remote.clone().unwrap_or_default())
}

fn merge_remote(env: RemoteSettings, file: RemoteSettings) -> Option<RestConfig> {
    Some(RestConfig {
        url: env.url.or(file.url)?,
        api_key: env.api_key.or(file.api_key)?,
        access_token: env.access_token.or(file.access_token),
    })
}
