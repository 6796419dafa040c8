//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Graph-Harvest database.
//! Identifier rows are never updated or deleted; checkpoint tables are append-only.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Social graph frontier
CREATE TABLE IF NOT EXISTS user_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE,
    name TEXT,
    discovered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_token_checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id INTEGER NOT NULL,
    cursor_a TEXT NOT NULL,
    cursor_b TEXT,
    created_at TEXT NOT NULL
);

-- Topic tree frontier
CREATE TABLE IF NOT EXISTS topic_ids (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE,
    name TEXT,
    discovered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topic_id_checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id INTEGER NOT NULL,
    cursor_a TEXT NOT NULL,
    cursor_b TEXT,
    created_at TEXT NOT NULL
);

-- Counters scraped from topic pages
CREATE TABLE IF NOT EXISTS topic_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic_row_id INTEGER NOT NULL UNIQUE,
    follower_count INTEGER,
    question_count INTEGER,
    scraped_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topic_stats_checkpoints (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic_row_id INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
