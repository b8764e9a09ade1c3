//! Supabase Storage implementation of ImageRepository
//!
//! Ensures the bucket exists (409 = already there), uploads the decoded
//! data-URL bytes under a unique key and returns the public object URL.

use async_trait::async_trait;
use base64::prelude::*;
use chrono::Utc;
use log::{debug, info};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use kcal_domain::repository::ImageRepository;
use kcal_types::{ImageReference, StorageError};

pub const DEFAULT_BUCKET: &str = "ai-uploads";
pub const DEFAULT_PREFIX: &str = "camera";
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Supabase project
#[derive(Debug, Clone)]
pub struct SupabaseStorageOptions {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub base_url: String,
    pub service_key: Option<String>,
    pub bucket: String,
    pub prefix: String,
    /// Bound on bucket check plus upload
    pub timeout: Duration,
}

impl SupabaseStorageOptions {
    pub fn new(base_url: impl Into<String>, service_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key,
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

pub struct SupabaseImageRepository {
    options: SupabaseStorageOptions,
    client: reqwest::Client,
}

impl SupabaseImageRepository {
    pub fn new(options: SupabaseStorageOptions) -> Self {
        Self {
            options,
            client: reqwest::Client::new(),
        }
    }

    fn base(&self) -> &str {
        self.options.base_url.trim_end_matches('/')
    }

    /// Public URL for an object key
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base(),
            self.options.bucket,
            key
        )
    }

    /// Unique object key for a new upload
    pub fn object_key(&self, mime_type: &str) -> String {
        format!(
            "{}/{}-{}.{}",
            self.options.prefix.trim_matches('/'),
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            extension_for(mime_type)
        )
    }

    async fn ensure_bucket(&self, service_key: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .post(format!("{}/storage/v1/bucket", self.base()))
            .bearer_auth(service_key)
            .header("apikey", service_key)
            .json(&json!({
                "id": self.options.bucket,
                "name": self.options.bucket,
                "public": true
            }))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 409 {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Bucket {
            status: status.as_u16(),
            body,
        })
    }

    async fn upload(
        &self,
        service_key: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.ensure_bucket(service_key).await?;

        let key = self.object_key(mime_type);
        debug!("Uploading {} bytes to {}/{}", bytes.len(), self.options.bucket, key);

        let response = self
            .client
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base(),
                self.options.bucket,
                key
            ))
            .bearer_auth(service_key)
            .header("apikey", service_key)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                status: status.as_u16(),
                body,
            });
        }

        let url = self.public_url(&key);
        info!("Stored image at {url}");
        Ok(url)
    }
}

#[async_trait]
impl ImageRepository for SupabaseImageRepository {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn persist(&self, image: &ImageReference) -> Result<String, StorageError> {
        let service_key = self
            .options
            .service_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(StorageError::MissingCredentials)?;
        if self.options.base_url.trim().is_empty() {
            return Err(StorageError::MissingCredentials);
        }

        let (mime_type, payload) = image.data_parts().ok_or(StorageError::InvalidDataUrl)?;
        let bytes = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|_| StorageError::InvalidDataUrl)?;

        tokio::time::timeout(self.options.timeout, self.upload(service_key, mime_type, bytes))
            .await
            .map_err(|_| {
                StorageError::Transport(format!(
                    "upload timed out after {}ms",
                    self.options.timeout.as_millis()
                ))
            })?
    }
}

/// File extension for an image MIME type; `jpg` when unrecognized
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "jpg",
    }
}
