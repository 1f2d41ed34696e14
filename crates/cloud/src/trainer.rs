//! Trigger for the external training workflow.
//!
//! The trainer is reached through a webhook URL. A trigger only starts the
//! work; the trainer reports the outcome later by calling the relay's
//! callback endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use trainrelay_core::types::JobId;

use crate::retry::{next_delay, RetryPolicy};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Everything the trainer needs to fetch the dataset and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingRequest {
    pub csv_url: String,
    pub email: String,
    pub job_id: JobId,
    pub callback_url: String,
}

/// Starts training for a stored dataset.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn trigger(&self, request: &TrainingRequest) -> Result<(), TrainerError>;
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from the trainer webhook.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// The webhook did not answer within the configured timeout.
    #[error("Trainer webhook timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Trainer webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The webhook returned a non-2xx status code.
    #[error("Trainer webhook returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Webhook implementation
// ---------------------------------------------------------------------------

/// JSON body sent to the webhook. The callback URL is sent under both key
/// spellings the trainer deployments read.
#[derive(Serialize)]
struct TriggerBody<'a> {
    #[serde(rename = "csvUrl")]
    csv_url: &'a str,
    email: &'a str,
    #[serde(rename = "jobId")]
    job_id: JobId,
    callback_url: &'a str,
    #[serde(rename = "callbackUrl")]
    callback_url_camel: &'a str,
}

impl<'a> From<&'a TrainingRequest> for TriggerBody<'a> {
    fn from(req: &'a TrainingRequest) -> Self {
        Self {
            csv_url: &req.csv_url,
            email: &req.email,
            job_id: req.job_id,
            callback_url: &req.callback_url,
            callback_url_camel: &req.callback_url,
        }
    }
}

/// Triggers training by POSTing JSON to a webhook URL.
pub struct WebhookTrainer {
    client: reqwest::Client,
    webhook_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl WebhookTrainer {
    /// Create a trainer client. Each attempt is bounded by `timeout`.
    pub fn new(
        webhook_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, TrainerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            timeout,
            retry,
        })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, body: &TriggerBody<'_>) -> Result<(), TrainerError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrainerError::Timeout(self.timeout)
                } else {
                    TrainerError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TrainerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Trainer for WebhookTrainer {
    /// Trigger training, retrying per the configured [`RetryPolicy`].
    ///
    /// Returns the last error once the retry budget is spent.
    async fn trigger(&self, request: &TrainingRequest) -> Result<(), TrainerError> {
        let body = TriggerBody::from(request);
        let mut delay = self.retry.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.try_send(&body).await {
                Ok(()) => {
                    tracing::info!(job_id = %request.job_id, attempt, "Trainer triggered");
                    return Ok(());
                }
                Err(e) if attempt <= self.retry.max_retries => {
                    tracing::warn!(
                        job_id = %request.job_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Trainer trigger failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, &self.retry);
                }
                Err(e) => {
                    tracing::error!(job_id = %request.job_id, attempt, error = %e, "Trainer trigger failed");
                    return Err(e);
                }
            }
        }
    }
}
