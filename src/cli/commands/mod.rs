//! Command implementations.

pub mod checkin;
pub mod completions;
pub mod folder;
pub mod init;
pub mod note;
pub mod queue;
pub mod status;
pub mod sync;
pub mod task;
pub mod version;
