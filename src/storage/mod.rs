//! Storage module for persisting the frontier and resume markers
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - The deduplicated, insertion-ordered identifier frontier
//! - Append-only checkpoints for resuming a traversal
//! - Topic statistics collected by the topic page pass

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{CheckpointStore, FrontierStore, StorageError, StorageResult, TopicStatsStore};

/// Reference row id of a checkpoint that restarts the traversal from the root
///
/// AUTOINCREMENT never hands out 0, so the derived offset of this marker is always 0.
pub const RESTART_FROM_ROOT: i64 = 0;

/// An identifier about to be written into the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentifier {
    pub token: String,
    pub name: Option<String>,
}

impl NewIdentifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: None,
        }
    }

    pub fn with_name(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            name: Some(name.into()),
        }
    }
}

/// Represents an identifier in the frontier
///
/// Records are immutable once written; `row_id` ordering is discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRecord {
    pub row_id: i64,
    pub token: String,
    pub name: Option<String>,
}

/// A resume marker: which identifier to restart at, and where each of its
/// edge expansions left off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub reference_row_id: i64,

    /// One pending next-page URL per edge kind, in the mode's edge order
    pub cursors: Vec<String>,
}

impl Checkpoint {
    pub fn new(reference_row_id: i64, cursors: Vec<String>) -> Self {
        Self {
            reference_row_id,
            cursors,
        }
    }

    /// Checkpoint that sends the next run back to the root with fresh seed cursors
    pub fn restart_from_root(root_cursors: Vec<String>) -> Self {
        Self::new(RESTART_FROM_ROOT, root_cursors)
    }

    pub fn is_restart_from_root(&self) -> bool {
        self.reference_row_id == RESTART_FROM_ROOT
    }
}

/// Represents a persisted checkpoint row
#[derive(Debug, Clone)]
pub struct CheckpointRecord {
    pub row_id: i64,
    pub checkpoint: Checkpoint,
    pub created_at: String,
}

/// Counters scraped from a topic's page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicStats {
    pub topic_row_id: i64,
    pub follower_count: Option<u64>,
    pub question_count: Option<u64>,
}
