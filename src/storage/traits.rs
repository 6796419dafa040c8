//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types.

use crate::storage::{
    Checkpoint, CheckpointRecord, IdentifierRecord, NewIdentifier, TopicStats,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested row does not exist. For checkpoints this means
    /// "never ran", for the frontier it means "exhausted".
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable, insertion-ordered, deduplicated set of discovered identifiers
///
/// Implementations must be safe to share between tasks; any consistency the
/// frontier needs is the backend's job, callers hold no locks.
pub trait FrontierStore: Send + Sync {
    /// Inserts every identifier whose token is not present yet
    ///
    /// Tokens already in the frontier are skipped silently.
    ///
    /// # Returns
    ///
    /// The number of identifiers actually added
    fn insert_if_absent(&self, identifiers: &[NewIdentifier]) -> StorageResult<usize>;

    /// Gets the identifier ranked at `offset` by ascending row id
    ///
    /// Returns `StorageError::NotFound` past the end of the frontier.
    fn get_at(&self, offset: u64) -> StorageResult<IdentifierRecord>;

    /// Counts identifiers whose row id is strictly smaller than `row_id`
    fn offset_of(&self, row_id: i64) -> StorageResult<u64>;

    /// Gets total identifier count
    fn count(&self) -> StorageResult<u64>;
}

/// Durable append-only log of resume markers
pub trait CheckpointStore: Send + Sync {
    /// Appends a checkpoint, returning its row id
    fn append(&self, checkpoint: &Checkpoint) -> StorageResult<i64>;

    /// Gets the most recently appended checkpoint
    ///
    /// Returns `StorageError::NotFound` if no run has ever persisted one.
    fn latest(&self) -> StorageResult<CheckpointRecord>;
}

/// Storage for the topic page statistics pass
pub trait TopicStatsStore: Send + Sync {
    /// Records stats for a topic unless that topic already has a row
    ///
    /// # Returns
    ///
    /// `true` if a row was written
    fn insert_topic_stats(&self, stats: &TopicStats) -> StorageResult<bool>;

    /// Gets the stats recorded for a topic row
    fn get_topic_stats(&self, topic_row_id: i64) -> StorageResult<TopicStats>;

    /// Counts topics with recorded stats
    fn count_topic_stats(&self) -> StorageResult<u64>;

    /// Appends the topic row id the next statistics pass should resume at
    fn append_stats_checkpoint(&self, topic_row_id: i64) -> StorageResult<i64>;

    /// Gets the topic row id of the latest statistics checkpoint
    fn latest_stats_checkpoint(&self) -> StorageResult<i64>;
}
