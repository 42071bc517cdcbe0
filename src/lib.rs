//! Flowmate offline core.
//!
//! Local-first persistence for tasks, daily check-ins, notes, folders, and
//! knowledge items, with a durable queue that replays writes to the remote
//! once connectivity returns.
//!
//! # Architecture
//!
//! - [`model`] - Entities, collection declarations, and queue entries
//! - [`storage`] - SQLite store for records and the sync queue
//! - [`remote`] - Remote backends (PostgREST over HTTP, in-memory)
//! - [`repository`] - Offline-first repositories per entity
//! - [`sync`] - Queue replay, connectivity, and drain scheduling
//! - [`config`] - Store path, owner, and remote settings
//! - [`validate`] - Synonym normalization for CLI input
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod repository;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
