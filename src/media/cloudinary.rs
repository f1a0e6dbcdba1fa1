//! Cloudinary upload API client

use super::{MediaStore, UploadOptions, UploadedAsset};
use crate::config::MediaConfig;
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;

/// Signed client for the image upload and destroy endpoints
pub struct CloudinaryClient {
    http: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryClient {
    /// Build a client from configuration. Fails when credentials are missing.
    pub fn new(config: &MediaConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(CloudinaryClient {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.api_base, self.cloud_name, action
        )
    }

    /// Sign the parameters: sorted `key=value` pairs joined by `&`, secret
    /// appended, SHA-256 hex digest
    fn sign(&self, params: &BTreeMap<&'static str, String>) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Signed form fields for `params`, stamped with the current time
    fn signed_form(&self, mut params: BTreeMap<&'static str, String>) -> Form {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = self.sign(&params);

        params
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    async fn error_from(response: reqwest::Response) -> CoreError {
        let status = response.status();
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => "no error details".to_string(),
        };
        CoreError::Upstream(format!("{}: {}", status, message))
    }
}

fn upload_params(options: &UploadOptions) -> BTreeMap<&'static str, String> {
    let mut params = BTreeMap::new();
    params.insert("folder", options.folder.clone());
    if let Some(public_id) = &options.public_id {
        params.insert("public_id", public_id.clone());
    }
    params.insert("overwrite", options.overwrite.to_string());
    params.insert("transformation", options.transform.to_chain());
    params
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(&self, bytes: Vec<u8>, options: &UploadOptions) -> Result<UploadedAsset> {
        let size = bytes.len();
        let form = self
            .signed_form(upload_params(options))
            .part("file", Part::bytes(bytes).file_name("upload"));

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: UploadResponse = response.json().await?;
        tracing::debug!(
            asset_id = %body.public_id,
            bytes = size,
            folder = %options.folder,
            "Uploaded image to media host"
        );

        Ok(UploadedAsset {
            url: body.secure_url,
            asset_id: body.public_id,
        })
    }

    async fn delete(&self, asset_id: &str) -> Result<()> {
        let mut params = BTreeMap::new();
        params.insert("public_id", asset_id.to_string());
        params.insert("invalidate", "true".to_string());

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .multipart(self.signed_form(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            // Already gone counts as deleted
            "ok" | "not found" => Ok(()),
            other => Err(CoreError::Upstream(format!(
                "destroy of {} returned {:?}",
                asset_id, other
            ))),
        }
    }
}
