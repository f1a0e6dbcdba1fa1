//! SQLite schema for MessVerse
//!
//! Two collections: one portrait per member, and the memories gallery.

use rusqlite::{Connection, Result};

/// Initialize the database with required tables
pub fn init_db(conn: &Connection) -> Result<()> {
    // One row per member, upserted on every portrait upload
    conn.execute(
        "CREATE TABLE IF NOT EXISTS member_portraits (
            member_id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            media_asset_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Gallery entries; rows are never updated, only inserted or deleted
    conn.execute(
        "CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            media_asset_id TEXT,
            caption TEXT,
            alt TEXT,
            member_id TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    create_indexes(conn)?;

    Ok(())
}

/// Create database indexes for query performance
fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at DESC)",
        [],
    )?;

    Ok(())
}
