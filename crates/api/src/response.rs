//! Typed response bodies for the relay endpoints.

use serde::Serialize;
use trainrelay_core::types::JobId;

/// Success body for `POST /api/upload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    pub job_id: JobId,
}

/// Acknowledgement for `POST /api/callback`. Always the same body.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub status: &'static str,
    pub message: &'static str,
}

impl CallbackAck {
    pub fn processed() -> Self {
        Self {
            status: "success",
            message: "Callback processed",
        }
    }
}
