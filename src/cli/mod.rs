//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod backend;
pub mod commands;
pub mod output;
pub mod workspace;

/// Flowmate offline core - local tasks, notes, and check-ins with a sync queue
#[derive(Parser, Debug)]
#[command(name = "fm", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store path (default: ~/.flowmate/data/offline.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Owner (user) id all records are scoped to
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Never contact the remote; every write is queued
    #[arg(long, global = true)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the offline store (and a config file if none exists)
    Init,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Task board
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Note folders
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// Daily energy check-ins
    Checkin {
        #[command(subcommand)]
        command: CheckinCommands,
    },

    /// Inspect or prune the sync queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Replay pending writes to the remote
    Sync,

    /// Show store, connectivity, and queue status
    Status,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Task Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Quadrant (q1-q4, do, schedule, delegate, eliminate, Q1_DO, ...)
        #[arg(short = 'Q', long, default_value = "q2")]
        quadrant: String,

        /// Energy cost (1-5 or drained, low, steady, high, peak)
        #[arg(short, long, default_value = "3")]
        energy: String,

        /// Duration in minutes
        #[arg(short, long, default_value_t = 30)]
        duration: u32,

        /// Due date ("Feb 4, 2025 at 10:30 AM", "2025-02-04", "Tomorrow", ...)
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks in due order
    List {
        /// Only this quadrant
        #[arg(short = 'Q', long)]
        quadrant: Option<String>,

        /// Only this status (pending, completed, missed, done, todo, ...)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Update a task
    Update {
        /// Task ID (or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short = 'Q', long)]
        quadrant: Option<String>,

        #[arg(short, long)]
        energy: Option<String>,

        #[arg(short, long)]
        duration: Option<u32>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        due: Option<String>,
    },

    /// Toggle a task between completed and pending
    Done {
        /// Task ID (or unique prefix)
        id: String,
    },

    /// Move missed tasks back to pending, due tomorrow
    FixMissed,

    /// Delete a task
    Rm {
        /// Task ID (or unique prefix)
        id: String,
    },
}

// ============================================================================
// Note Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Add a note
    Add {
        /// Note title
        title: String,

        /// Note body
        #[arg(short, long, default_value = "")]
        content: String,

        /// Folder ID (or unique prefix)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// List notes, most recently edited first
    List {
        /// Only notes in this folder
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Update a note
    Update {
        /// Note ID (or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        /// Move into this folder
        #[arg(short, long, conflicts_with = "unfile")]
        folder: Option<String>,

        /// Take the note out of its folder
        #[arg(long)]
        unfile: bool,
    },

    /// Delete a note
    Rm {
        /// Note ID (or unique prefix)
        id: String,
    },
}

// ============================================================================
// Folder Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder
    Add {
        /// Folder name
        name: String,

        /// Parent folder ID (or unique prefix)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List folders
    List,

    /// Delete a folder; its notes become unfiled
    Rm {
        /// Folder ID (or unique prefix)
        id: String,
    },
}

// ============================================================================
// Check-in Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum CheckinCommands {
    /// Record (or replace) the check-in for a day
    Save {
        /// Energy level (1-5 or drained, low, steady, high, peak)
        energy: String,

        /// Free-form reflection
        #[arg(short, long)]
        reflection: Option<String>,

        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List recent check-ins, newest first
    List {
        /// Maximum entries to show
        #[arg(short, long, default_value_t = 7)]
        limit: usize,
    },
}

// ============================================================================
// Queue Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// List queue entries, newest first
    List {
        /// Include synced entries
        #[arg(short, long)]
        all: bool,

        /// Maximum entries to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Delete synced entries older than the retention window
    Prune {
        /// Retention window in hours (default: configured retention)
        #[arg(long)]
        older_than: Option<i64>,
    },
}
