//! Handler for result notifications from the external trainer.
//!
//! The trainer has no retry contract and is not authenticated, so this
//! endpoint acknowledges everything it can: malformed bodies, unknown jobs
//! and late updates to finished jobs are logged and answered with success.
//! Only a store failure produces an error response.
//!
//! The job id is read from the body, or from the `jobId` query parameter of
//! the per-job callback URL handed to the trainer.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use trainrelay_core::callback::CallbackPayload;
use trainrelay_core::error::CoreError;

use crate::error::{AppError, AppResult};
use crate::response::CallbackAck;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default, rename = "jobId", alias = "job_id")]
    pub job_id: Option<String>,
}

/// POST /api/callback[?jobId=...]
pub async fn receive_callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    body: Bytes,
) -> AppResult<Json<CallbackAck>> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed callback query ignored");
            CallbackQuery::default()
        }
    };

    let payload: CallbackPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Malformed callback body ignored");
            return Ok(Json(CallbackAck::processed()));
        }
    };

    let update = match payload.or_job_id(query.job_id).into_update() {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, "Unusable callback payload ignored");
            return Ok(Json(CallbackAck::processed()));
        }
    };

    let job_id = update.job_id;
    match state.jobs.update(job_id, update.patch).await {
        Ok(job) => {
            tracing::info!(job_id = %job_id, status = %job.status, "Callback applied");
        }
        Err(CoreError::NotFound { .. }) => {
            tracing::info!(job_id = %job_id, "Callback for unknown job ignored");
        }
        Err(e @ CoreError::InvalidTransition { .. }) => {
            tracing::warn!(job_id = %job_id, error = %e, "Callback conflicts with finished job, ignored");
        }
        Err(e) => {
            return Err(AppError::InternalError(format!(
                "Failed to apply callback for job {job_id}: {e}"
            )));
        }
    }

    Ok(Json(CallbackAck::processed()))
}
