//! HTTP route handlers for the API

use super::AppState;
use crate::db::MAX_LIST_LIMIT;
use crate::error::{CoreError, Result};
use crate::handlers::{clean_field, MemoryUpload};
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;

/// Default page size for the gallery
pub const DEFAULT_MEMORIES_LIMIT: usize = 60;

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Multipart uploads
// ============================================================================

/// Text fields plus the single image part of an upload
#[derive(Debug, Default)]
struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<Vec<u8>>,
}

impl UploadForm {
    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError, max_file_bytes: usize) -> CoreError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CoreError::PayloadTooLarge(max_file_bytes)
    } else {
        CoreError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

async fn read_upload_form(
    multipart: std::result::Result<Multipart, MultipartRejection>,
    max_file_bytes: usize,
) -> Result<UploadForm> {
    let mut multipart = multipart
        .map_err(|e| CoreError::Validation(format!("Expected multipart form data: {}", e.body_text())))?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            if form.file.is_some() {
                return Err(CoreError::Validation("Only one file may be uploaded".into()));
            }
            if let Some(content_type) = field.content_type() {
                if !content_type.starts_with("image/") {
                    return Err(CoreError::Validation(format!(
                        "file must be an image, got {}",
                        content_type
                    )));
                }
            }

            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error(e, max_file_bytes))?;
            if bytes.len() > max_file_bytes {
                return Err(CoreError::PayloadTooLarge(max_file_bytes));
            }
            if !bytes.is_empty() {
                form.file = Some(bytes.to_vec());
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_file_bytes))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

// ============================================================================
// Member portraits
// ============================================================================

pub async fn list_portraits(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let portraits = state.portraits.list().await?;
    Ok(Json(serde_json::json!({ "portraits": portraits })))
}

pub async fn upload_portrait(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let mut form = read_upload_form(multipart, state.max_file_bytes).await?;

    let member_id = clean_field(form.take("memberId"))
        .ok_or_else(|| CoreError::Validation("memberId is required".into()))?;
    let file = form
        .file
        .ok_or_else(|| CoreError::Validation("file is required".into()))?;

    let saved = state.portraits.upload(&member_id, file).await?;
    Ok(Json(serde_json::json!({ "ok": true, "portrait": saved })))
}

// ============================================================================
// Memories
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListMemoriesQuery {
    pub limit: Option<String>,
}

/// Missing or blank → default; negative → 0; anything above the cap → cap
fn parse_limit(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_MEMORIES_LIMIT);
    };
    let requested: i64 = raw
        .parse()
        .map_err(|_| CoreError::Validation(format!("limit must be an integer, got {:?}", raw)))?;
    Ok(requested.clamp(0, MAX_LIST_LIMIT as i64) as usize)
}

pub async fn list_memories(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListMemoriesQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query
        .map_err(|e| CoreError::Validation(format!("Invalid query string: {}", e.body_text())))?;
    let limit = parse_limit(query.limit.as_deref())?;
    let memories = state.memories.list_recent(limit).await?;
    Ok(Json(serde_json::json!({ "memories": memories })))
}

pub async fn upload_memory(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let mut form = read_upload_form(multipart, state.max_file_bytes).await?;

    let file = form
        .file
        .take()
        .ok_or_else(|| CoreError::Validation("file is required".into()))?;
    let fields = MemoryUpload {
        caption: form.take("caption"),
        alt: form.take("alt"),
        member_id: form.take("memberId"),
    };

    let saved = state.memories.upload(fields, file).await?;
    Ok(Json(serde_json::json!({ "ok": true, "memory": saved })))
}

pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let outcome = state.memories.delete(&id).await?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "memory": outcome.memory,
        "mediaCleaned": outcome.secondary_cleaned
    })))
}
