//! SQLite storage layer for Flowmate.
//!
//! This module provides the local durable store using SQLite with:
//! - WAL mode for concurrent reads
//! - One JSON-backed table per collection with expression indexes
//! - The sync queue of unconfirmed mutations
//! - Additive, versioned migrations
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`migrations`] - Embedded migrations
//! - [`store`] - The `LocalStore` contract and shared handles
//! - [`sqlite`] - SQLite implementation

pub mod migrations;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use sqlite::SqliteStore;
pub use store::{LocalStore, open_store};
