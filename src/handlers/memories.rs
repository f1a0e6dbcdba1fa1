//! Memory handling logic

use super::clean_field;
use crate::db::{memories, Database, Memory, NewMemory};
use crate::error::{CoreError, Result};
use crate::media::{MediaStore, UploadOptions, MEMORY_TRANSFORM};
use serde::Serialize;
use std::sync::Arc;

/// Alt text used when neither alt nor caption is given
pub const DEFAULT_ALT: &str = "MessVerse memory";

/// Optional text fields sent with a gallery upload
#[derive(Debug, Clone, Default)]
pub struct MemoryUpload {
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub member_id: Option<String>,
}

/// Result of deleting a memory from both the database and the media host.
/// The database row is authoritative; media cleanup is advisory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub memory: Memory,
    pub primary_deleted: bool,
    pub secondary_cleaned: bool,
}

/// Memory handler for business logic
#[derive(Clone)]
pub struct MemoryService {
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
    folder: String,
}

impl MemoryService {
    pub fn new(db: Arc<Database>, media: Arc<dyn MediaStore>, folder: String) -> Self {
        MemoryService { db, media, folder }
    }

    /// Newest memories first, at most `limit` (itself capped at 200)
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Memory>> {
        self.db
            .with_conn(move |conn| memories::list_recent(conn, limit))
            .await
    }

    /// Upload an image to the gallery and record it
    pub async fn upload(&self, fields: MemoryUpload, image: Vec<u8>) -> Result<Memory> {
        let caption = clean_field(fields.caption);
        let alt = clean_field(fields.alt)
            .or_else(|| caption.clone())
            .unwrap_or_else(|| DEFAULT_ALT.to_string());
        let member_id = clean_field(fields.member_id);

        let options = UploadOptions {
            folder: self.folder.clone(),
            public_id: Some(format!("memory_{}", uuid::Uuid::new_v4().simple())),
            overwrite: false,
            transform: MEMORY_TRANSFORM,
        };
        let asset = self.media.upload(image, &options).await?;

        let new = NewMemory {
            url: asset.url,
            media_asset_id: Some(asset.asset_id),
            caption,
            alt: Some(alt),
            member_id,
        };
        let saved = self
            .db
            .with_conn(move |conn| memories::create(conn, new))
            .await?;

        tracing::info!(memory_id = %saved.id, url = %saved.url, "Memory saved");
        Ok(saved)
    }

    /// Delete a memory, then try to remove its image from the media host.
    ///
    /// Fails only when the database step fails: malformed id, unknown id, or
    /// a storage error. A media host failure is logged and reported through
    /// [`DeleteOutcome::secondary_cleaned`].
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        let lookup = id.to_string();
        let memory = self
            .db
            .with_conn(move |conn| memories::delete_by_id(conn, &lookup))
            .await?
            .ok_or_else(|| CoreError::NotFound("Memory", id.to_string()))?;

        let secondary_cleaned = match memory.media_asset_id.as_deref() {
            None => true,
            Some(asset_id) => match self.media.delete(asset_id).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        memory_id = %memory.id,
                        asset_id = %asset_id,
                        error = %e,
                        "Memory deleted but media asset could not be removed"
                    );
                    false
                }
            },
        };

        tracing::info!(memory_id = %memory.id, secondary_cleaned, "Memory deleted");
        Ok(DeleteOutcome {
            memory,
            primary_deleted: true,
            secondary_cleaned,
        })
    }
}
