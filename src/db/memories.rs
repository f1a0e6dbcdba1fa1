//! Gallery memory repository

use super::now_timestamp;
use crate::error::{CoreError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on any listing, whatever the caller asks for
pub const MAX_LIST_LIMIT: usize = 200;

/// One gallery entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub url: String,
    pub media_asset_id: Option<String>,
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub member_id: Option<String>,
    pub created_at: String,
}

/// Fields supplied when creating a memory
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub url: String,
    pub media_asset_id: Option<String>,
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub member_id: Option<String>,
}

impl Memory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Memory {
            id: row.get(0)?,
            url: row.get(1)?,
            media_asset_id: row.get(2)?,
            caption: row.get(3)?,
            alt: row.get(4)?,
            member_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, url, media_asset_id, caption, alt, member_id, created_at
                              FROM memories";

/// Most recent memories first. Equal timestamps fall back to insertion order,
/// latest insert first. `limit` is clamped to [`MAX_LIST_LIMIT`].
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<Memory>> {
    let limit = limit.min(MAX_LIST_LIMIT) as i64;
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY created_at DESC, rowid DESC LIMIT ?",
        SELECT_COLUMNS
    ))?;
    let memories = stmt
        .query_map([limit], Memory::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(memories)
}

/// Insert a memory with a fresh id and the current time
pub fn create(conn: &Connection, new: NewMemory) -> Result<Memory> {
    insert_at(conn, new, now_timestamp())
}

fn insert_at(conn: &Connection, new: NewMemory, created_at: String) -> Result<Memory> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO memories (id, url, media_asset_id, caption, alt, member_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            new.url,
            new.media_asset_id,
            new.caption,
            new.alt,
            new.member_id,
            created_at
        ],
    )?;

    Ok(Memory {
        id,
        url: new.url,
        media_asset_id: new.media_asset_id,
        caption: new.caption,
        alt: new.alt,
        member_id: new.member_id,
        created_at,
    })
}

/// Parse a client-supplied id into the canonical stored form
pub fn parse_id(id: &str) -> Result<String> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|_| CoreError::InvalidIdentifier(id.to_string()))
}

/// Get a single memory
pub fn get(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    let id = parse_id(id)?;
    let memory = conn
        .query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            [id],
            Memory::from_row,
        )
        .optional()?;
    Ok(memory)
}

/// Delete a memory, returning the removed row if there was one
pub fn delete_by_id(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    let Some(existing) = get(conn, id)? else {
        return Ok(None);
    };
    conn.execute("DELETE FROM memories WHERE id = ?", [&existing.id])?;
    Ok(Some(existing))
}
