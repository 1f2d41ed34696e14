//! HTTP client for the relay's upload and status endpoints.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use trainrelay_core::job::Job;
use trainrelay_core::types::JobId;
use trainrelay_core::upload::{UploadSubmission, CSV_CONTENT_TYPE, EMAIL_FIELD, FILE_FIELD};

use crate::error::ClientError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Success body of `POST /api/upload`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadAccepted {
    job_id: JobId,
}

/// Error body returned by the relay. Only the message is used.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client bound to one relay base URL.
#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a validated submission and return the new job id.
    pub async fn upload(&self, submission: UploadSubmission) -> Result<JobId, ClientError> {
        let file = Part::bytes(submission.content)
            .file_name(submission.filename)
            .mime_str(CSV_CONTENT_TYPE)?;
        let form = Form::new()
            .part(FILE_FIELD, file)
            .text(EMAIL_FIELD, submission.email);

        let response = self
            .client
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(server_error(response).await);
        }

        let accepted: UploadAccepted = response.json().await?;
        tracing::debug!(job_id = %accepted.job_id, "Upload accepted");
        Ok(accepted.job_id)
    }

    /// Fetch the current job record.
    pub async fn status(&self, job_id: JobId) -> Result<Job, ClientError> {
        let response = self
            .client
            .get(format!("{}/api/status/{job_id}", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(server_error(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Turn a non-2xx response into [`ClientError::Server`], keeping the relay's
/// `message` when the body carries one.
async fn server_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| crate::error::GENERIC_UPLOAD_ERROR.to_string());

    ClientError::Server { status, message }
}
