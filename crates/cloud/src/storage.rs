//! Object storage for uploaded datasets.
//!
//! [`SupabaseStorage`] talks to the Supabase Storage REST API: objects are
//! written with `POST /storage/v1/object/{bucket}/{key}` and served from the
//! public URL `/storage/v1/object/public/{bucket}/{path}`.

use std::time::Duration;

use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Location of an object written to storage, relative to its bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
}

/// Write-once object storage with publicly retrievable URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` in `bucket`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Public URL from which the trainer can fetch the object.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the object storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The request did not complete within the configured timeout.
    #[error("Storage upload timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The storage service returned a non-2xx status code.
    #[error("Storage API error ({status}): {body}")]
    Api { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Supabase implementation
// ---------------------------------------------------------------------------

/// Supabase Storage client authenticated with a service key.
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    timeout: Duration,
}

impl SupabaseStorage {
    /// Create a client for the project at `base_url`
    /// (e.g. `https://xyz.supabase.co`).
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            timeout,
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> StorageError {
        if err.is_timeout() {
            StorageError::Timeout(self.timeout)
        } else {
            StorageError::Request(err)
        }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let url = format!("{}/storage/v1/object/{bucket}/{key}", self.base_url);
        let size = bytes.len();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(bucket, key, size, "Object stored");
        Ok(StoredObject {
            path: key.to_string(),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }
}
