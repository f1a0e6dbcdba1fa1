//! Portrait handling logic

use super::clean_field;
use crate::db::{portraits, Database, MemberPortrait};
use crate::error::{CoreError, Result};
use crate::media::{MediaStore, UploadOptions, PORTRAIT_TRANSFORM};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Portrait handler for business logic
#[derive(Clone)]
pub struct PortraitService {
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
    folder: String,
}

impl PortraitService {
    pub fn new(db: Arc<Database>, media: Arc<dyn MediaStore>, folder: String) -> Self {
        PortraitService { db, media, folder }
    }

    /// Map of member id to current portrait URL
    pub async fn list(&self) -> Result<BTreeMap<String, String>> {
        let rows = self.db.with_conn(portraits::list_all).await?;
        Ok(rows.into_iter().map(|p| (p.member_id, p.url)).collect())
    }

    /// Upload a member's portrait, replacing any previous one.
    ///
    /// The asset id is fixed per member so the host overwrites the old image
    /// instead of accumulating copies.
    pub async fn upload(&self, member_id: &str, image: Vec<u8>) -> Result<MemberPortrait> {
        let member_id = clean_field(Some(member_id.to_string()))
            .ok_or_else(|| CoreError::Validation("memberId is required".into()))?;

        let options = UploadOptions {
            folder: self.folder.clone(),
            public_id: Some(format!("portrait_{}", member_id)),
            overwrite: true,
            transform: PORTRAIT_TRANSFORM,
        };
        let asset = self.media.upload(image, &options).await?;

        let saved = self
            .db
            .with_conn(move |conn| {
                portraits::upsert_by_member_id(
                    conn,
                    &member_id,
                    &asset.url,
                    Some(asset.asset_id.as_str()),
                )
            })
            .await?;

        tracing::info!(member_id = %saved.member_id, url = %saved.url, "Portrait saved");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fake::FakeMediaStore;
    use std::sync::atomic::Ordering;

    fn service() -> (PortraitService, Arc<FakeMediaStore>) {
        let db = Arc::new(Database::in_memory().unwrap());
        let media = Arc::new(FakeMediaStore::default());
        let service = PortraitService::new(db, media.clone(), "mess_verse/members".into());
        (service, media)
    }

    #[tokio::test]
    async fn test_upload_uses_fixed_identifier() {
        let (service, media) = service();
        let saved = service.upload(" alice ", vec![1, 2, 3]).await.unwrap();

        assert_eq!(saved.member_id, "alice");
        assert_eq!(
            saved.media_asset_id.as_deref(),
            Some("mess_verse/members/portrait_alice")
        );

        let options = media.last_upload().unwrap();
        assert_eq!(options.public_id.as_deref(), Some("portrait_alice"));
        assert!(options.overwrite);
        assert_eq!(options.transform, PORTRAIT_TRANSFORM);
    }

    #[tokio::test]
    async fn test_second_upload_overwrites_first() {
        let (service, _media) = service();
        service.upload("alice", vec![1]).await.unwrap();
        let second = service.upload("alice", vec![2]).await.unwrap();
        service.upload("bob", vec![3]).await.unwrap();

        let map = service.list().await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["alice"], second.url);
    }

    #[tokio::test]
    async fn test_blank_member_id_rejected_before_upload() {
        let (service, media) = service();
        let err = service.upload("   ", vec![1]).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(media.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_writes_nothing() {
        let (service, media) = service();
        media.fail_upload.store(true, Ordering::SeqCst);

        let err = service.upload("alice", vec![1]).await.unwrap_err();
        assert!(matches!(err, CoreError::Upstream(_)));
        assert!(service.list().await.unwrap().is_empty());
    }
}
