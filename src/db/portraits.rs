//! Member portrait repository

use super::now_timestamp;
use crate::error::Result;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// The current portrait of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPortrait {
    pub member_id: String,
    pub url: String,
    pub media_asset_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MemberPortrait {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MemberPortrait {
            member_id: row.get(0)?,
            url: row.get(1)?,
            media_asset_id: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT member_id, url, media_asset_id, created_at, updated_at
                              FROM member_portraits";

/// All portraits, ordered by member id
pub fn list_all(conn: &Connection) -> Result<Vec<MemberPortrait>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY member_id", SELECT_COLUMNS))?;
    let portraits = stmt
        .query_map([], MemberPortrait::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(portraits)
}

/// Create or replace the portrait for `member_id`.
///
/// `created_at` survives an overwrite; `url`, `media_asset_id` and
/// `updated_at` are replaced.
pub fn upsert_by_member_id(
    conn: &Connection,
    member_id: &str,
    url: &str,
    media_asset_id: Option<&str>,
) -> Result<MemberPortrait> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO member_portraits (member_id, url, media_asset_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(member_id) DO UPDATE SET
            url = excluded.url,
            media_asset_id = excluded.media_asset_id,
            updated_at = excluded.updated_at",
        params![member_id, url, media_asset_id, now],
    )?;

    let saved = conn.query_row(
        &format!("{} WHERE member_id = ?", SELECT_COLUMNS),
        [member_id],
        MemberPortrait::from_row,
    )?;
    Ok(saved)
}
