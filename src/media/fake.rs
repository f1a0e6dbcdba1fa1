//! In-process media store that records calls, for tests

use super::{MediaStore, UploadOptions, UploadedAsset};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeMediaStore {
    pub uploads: Mutex<Vec<(UploadOptions, usize)>>,
    pub deletes: Mutex<Vec<String>>,
    pub fail_upload: AtomicBool,
    pub fail_delete: AtomicBool,
    counter: AtomicUsize,
}

impl FakeMediaStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn last_upload(&self) -> Option<UploadOptions> {
        self.uploads.lock().unwrap().last().map(|(o, _)| o.clone())
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(&self, bytes: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(CoreError::Upstream("upload refused".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let name = options
            .public_id
            .clone()
            .unwrap_or_else(|| format!("asset{}", n));
        let asset_id = format!("{}/{}", options.folder, name);

        self.uploads
            .lock()
            .unwrap()
            .push((options.clone(), bytes.len()));

        Ok(UploadedAsset {
            url: format!("https://media.test/{}/v{}.jpg", asset_id, n),
            asset_id,
        })
    }

    async fn delete(&self, asset_id: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(asset_id.to_string());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CoreError::Upstream("destroy refused".into()));
        }
        Ok(())
    }
}
