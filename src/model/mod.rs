//! Data models for Flowmate.
//!
//! This module contains all domain models:
//! - Task
//! - DailySync
//! - Note and Folder
//! - KnowledgeItem
//! - QueueEntry
//!
//! plus the generic [`Record`] / [`Entity`] layer the store and
//! repositories work with.

pub mod daily_sync;
pub mod knowledge;
pub mod note;
pub mod queue;
pub mod record;
pub mod task;

pub use daily_sync::{DailySync, DailySyncPatch, NewDailySync};
pub use knowledge::{KnowledgeItem, KnowledgeItemType, NewKnowledgeItem};
pub use note::{Folder, NewFolder, NewNote, Note, NotePatch};
pub use queue::{QueueCounts, QueueEntry, SyncOperation};
pub use record::{COLLECTIONS, CollectionSchema, Entity, Record, schema_for};
pub use task::{NewTask, Quadrant, Task, TaskPatch, TaskStatus};
