//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the frontier,
//! checkpoint and topic statistics traits.

use crate::state::{CrawlMode, TableSet};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    CheckpointStore, FrontierStore, StorageError, StorageResult, TopicStatsStore,
};
use crate::storage::{Checkpoint, CheckpointRecord, IdentifierRecord, NewIdentifier, TopicStats};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection lives behind a mutex so one handle can be shared by the
/// orchestrator and the reporter through `Arc`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    tables: TableSet,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `mode` - Crawl mode selecting the frontier and checkpoint tables
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path, mode: CrawlMode) -> Result<Self, HarvestError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            tables: mode.tables(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(mode: CrawlMode) -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
            tables: mode.tables(),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

impl FrontierStore for SqliteStorage {
    fn insert_if_absent(&self, identifiers: &[NewIdentifier]) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {} (token, name, discovered_at) VALUES (?1, ?2, ?3)",
                self.tables.identifiers
            ))?;
            for identifier in identifiers {
                inserted += stmt.execute(params![identifier.token, identifier.name, now])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn get_at(&self, offset: u64) -> StorageResult<IdentifierRecord> {
        let sql_offset = i64::try_from(offset)
            .map_err(|_| StorageError::NotFound(format!("No identifier at offset {}", offset)))?;

        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT id, token, name FROM {} ORDER BY id LIMIT 1 OFFSET ?1",
                self.tables.identifiers
            ),
            params![sql_offset],
            |row| {
                Ok(IdentifierRecord {
                    row_id: row.get(0)?,
                    token: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("No identifier at offset {}", offset)))
    }

    fn offset_of(&self, row_id: i64) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE id < ?1",
                self.tables.identifiers
            ),
            params![row_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.tables.identifiers),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl CheckpointStore for SqliteStorage {
    fn append(&self, checkpoint: &Checkpoint) -> StorageResult<i64> {
        let cursor_a = checkpoint.cursors.first().cloned().unwrap_or_default();
        let cursor_b = checkpoint.cursors.get(1).cloned();
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (reference_id, cursor_a, cursor_b, created_at) VALUES (?1, ?2, ?3, ?4)",
                self.tables.checkpoints
            ),
            params![checkpoint.reference_row_id, cursor_a, cursor_b, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn latest(&self) -> StorageResult<CheckpointRecord> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT id, reference_id, cursor_a, cursor_b, created_at FROM {} ORDER BY id DESC LIMIT 1",
                self.tables.checkpoints
            ),
            [],
            |row| {
                let mut cursors = vec![row.get::<_, String>(2)?];
                if let Some(cursor_b) = row.get::<_, Option<String>>(3)? {
                    cursors.push(cursor_b);
                }

                Ok(CheckpointRecord {
                    row_id: row.get(0)?,
                    checkpoint: Checkpoint::new(row.get(1)?, cursors),
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound("No checkpoint has been written".to_string()))
    }
}

impl TopicStatsStore for SqliteStorage {
    fn insert_topic_stats(&self, stats: &TopicStats) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO topic_stats (topic_row_id, follower_count, question_count, scraped_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                stats.topic_row_id,
                stats.follower_count.map(|c| c as i64),
                stats.question_count.map(|c| c as i64),
                now
            ],
        )?;
        Ok(changed == 1)
    }

    fn get_topic_stats(&self, topic_row_id: i64) -> StorageResult<TopicStats> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT topic_row_id, follower_count, question_count FROM topic_stats WHERE topic_row_id = ?1",
            params![topic_row_id],
            |row| {
                Ok(TopicStats {
                    topic_row_id: row.get(0)?,
                    follower_count: row.get::<_, Option<i64>>(1)?.map(|c| c as u64),
                    question_count: row.get::<_, Option<i64>>(2)?.map(|c| c as u64),
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("No stats for topic row {}", topic_row_id)))
    }

    fn count_topic_stats(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM topic_stats", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn append_stats_checkpoint(&self, topic_row_id: i64) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO topic_stats_checkpoints (topic_row_id, created_at) VALUES (?1, ?2)",
            params![topic_row_id, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn latest_stats_checkpoint(&self) -> StorageResult<i64> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT topic_row_id FROM topic_stats_checkpoints ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound("No topic stats checkpoint".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RESTART_FROM_ROOT;

    fn social_storage() -> SqliteStorage {
        SqliteStorage::new_in_memory(CrawlMode::HarvestSocialGraph).unwrap()
    }

    fn tokens(values: &[&str]) -> Vec<NewIdentifier> {
        values.iter().map(|v| NewIdentifier::new(*v)).collect()
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory(CrawlMode::HarvestTopicTree);
        assert!(storage.is_ok());
    }

    #[test]
    fn test_insert_duplicate_is_noop() {
        let storage = social_storage();

        assert_eq!(storage.insert_if_absent(&tokens(&["alice"])).unwrap(), 1);
        assert_eq!(storage.count().unwrap(), 1);

        assert_eq!(storage.insert_if_absent(&tokens(&["alice"])).unwrap(), 0);
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_batch_skips_only_known_tokens() {
        let storage = social_storage();
        storage.insert_if_absent(&tokens(&["alice", "bob"])).unwrap();

        let added = storage
            .insert_if_absent(&tokens(&["bob", "carol", "alice", "dave"]))
            .unwrap();

        assert_eq!(added, 2);
        assert_eq!(storage.count().unwrap(), 4);
    }

    #[test]
    fn test_get_at_follows_discovery_order() {
        let storage = social_storage();
        storage
            .insert_if_absent(&tokens(&["root", "a", "b"]))
            .unwrap();

        let order: Vec<String> = (0..3)
            .map(|offset| storage.get_at(offset).unwrap().token)
            .collect();
        assert_eq!(order, vec!["root", "a", "b"]);
    }

    #[test]
    fn test_get_at_past_end_is_not_found() {
        let storage = social_storage();
        storage.insert_if_absent(&tokens(&["root"])).unwrap();

        let err = storage.get_at(1).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_offset_of_ignores_row_id_gaps() {
        let storage = social_storage();
        {
            let conn = storage.lock().unwrap();
            conn.execute_batch(
                "INSERT INTO user_tokens (id, token, discovered_at) VALUES (1, 'root', 'x');
                 INSERT INTO user_tokens (id, token, discovered_at) VALUES (5, 'a', 'x');
                 INSERT INTO user_tokens (id, token, discovered_at) VALUES (9, 'b', 'x');",
            )
            .unwrap();
        }

        assert_eq!(storage.offset_of(9).unwrap(), 2);
        assert_eq!(storage.offset_of(5).unwrap(), 1);
        assert_eq!(storage.offset_of(RESTART_FROM_ROOT).unwrap(), 0);

        let record = storage.get_at(storage.offset_of(9).unwrap()).unwrap();
        assert_eq!(record.row_id, 9);
        assert_eq!(record.token, "b");
    }

    #[test]
    fn test_display_name_is_kept() {
        let storage = SqliteStorage::new_in_memory(CrawlMode::HarvestTopicTree).unwrap();
        storage
            .insert_if_absent(&[NewIdentifier::with_name("19776749", "Root topic")])
            .unwrap();

        let record = storage.get_at(0).unwrap();
        assert_eq!(record.name.as_deref(), Some("Root topic"));
    }

    #[test]
    fn test_modes_do_not_share_a_frontier() {
        let social = social_storage();
        social.insert_if_absent(&tokens(&["alice"])).unwrap();

        // Same connection, other mode's tables
        let conn = social.conn.into_inner().unwrap();
        let topic = SqliteStorage {
            conn: Mutex::new(conn),
            tables: CrawlMode::HarvestTopicTree.tables(),
        };
        assert_eq!(topic.count().unwrap(), 0);
    }

    #[test]
    fn test_latest_checkpoint_not_found_when_never_run() {
        let storage = social_storage();
        let err = storage.latest().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_latest_checkpoint_is_last_appended() {
        let storage = social_storage();
        storage
            .append(&Checkpoint::new(3, vec!["a1".into(), "b1".into()]))
            .unwrap();
        storage
            .append(&Checkpoint::new(2, vec!["a2".into(), "b2".into()]))
            .unwrap();

        let latest = storage.latest().unwrap();
        assert_eq!(latest.checkpoint.reference_row_id, 2);
        assert_eq!(latest.checkpoint.cursors, vec!["a2", "b2"]);
    }

    #[test]
    fn test_single_cursor_checkpoint_roundtrip() {
        let storage = SqliteStorage::new_in_memory(CrawlMode::HarvestTopicTree).unwrap();
        storage
            .append(&Checkpoint::new(4, vec!["children".into()]))
            .unwrap();

        let latest = storage.latest().unwrap();
        assert_eq!(latest.checkpoint.cursors, vec!["children"]);
    }

    #[test]
    fn test_topic_stats_recorded_once() {
        let storage = SqliteStorage::new_in_memory(CrawlMode::HarvestTopicTree).unwrap();
        let first = TopicStats {
            topic_row_id: 1,
            follower_count: Some(120),
            question_count: Some(7),
        };
        let second = TopicStats {
            follower_count: Some(999),
            ..first
        };

        assert!(storage.insert_topic_stats(&first).unwrap());
        assert!(!storage.insert_topic_stats(&second).unwrap());
        assert_eq!(storage.count_topic_stats().unwrap(), 1);
        assert_eq!(storage.get_topic_stats(1).unwrap(), first);
    }

    #[test]
    fn test_stats_checkpoint_latest_wins() {
        let storage = SqliteStorage::new_in_memory(CrawlMode::HarvestTopicTree).unwrap();
        assert!(storage.latest_stats_checkpoint().unwrap_err().is_not_found());

        storage.append_stats_checkpoint(4).unwrap();
        storage.append_stats_checkpoint(RESTART_FROM_ROOT).unwrap();
        assert_eq!(storage.latest_stats_checkpoint().unwrap(), RESTART_FROM_ROOT);
    }
}
