//! Media host integration
//!
//! Image bytes never touch local storage: they are pushed to the media host,
//! which applies the requested transformation and hands back a public URL
//! plus an asset id used later for deletion.

mod cloudinary;
#[cfg(test)]
pub(crate) mod fake;

pub use cloudinary::CloudinaryClient;

use crate::error::Result;
use async_trait::async_trait;

/// Bounding box applied with "fit within" semantics, plus automatic
/// quality and format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub max_width: u32,
    pub max_height: u32,
}

impl Transform {
    pub const fn fit_within(max_width: u32, max_height: u32) -> Self {
        Transform {
            max_width,
            max_height,
        }
    }

    /// Transformation chain in the host's URL syntax
    pub fn to_chain(&self) -> String {
        format!(
            "c_limit,w_{},h_{}/q_auto/f_auto",
            self.max_width, self.max_height
        )
    }
}

/// Portraits are capped at 1200x1200
pub const PORTRAIT_TRANSFORM: Transform = Transform::fit_within(1200, 1200);

/// Gallery memories are capped at 2200x2200
pub const MEMORY_TRANSFORM: Transform = Transform::fit_within(2200, 2200);

/// Per-upload options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Destination folder on the host
    pub folder: String,
    /// Fixed identifier; `None` lets the host pick one
    pub public_id: Option<String>,
    /// Replace an existing asset with the same identifier
    pub overwrite: bool,
    pub transform: Transform,
}

/// What the host returns for a stored asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
    pub asset_id: String,
}

/// A remote image store
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload an in-memory image
    async fn upload(&self, bytes: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset>;

    /// Delete an asset by id
    async fn delete(&self, asset_id: &str) -> Result<()>;
}
