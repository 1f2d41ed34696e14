//! Handler for job status polling.

use axum::extract::{Path, State};
use axum::Json;
use trainrelay_core::error::CoreError;
use trainrelay_core::job::Job;
use trainrelay_core::types::JobId;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/status/{job_id}
///
/// Return the current job record. Identifiers that are not UUIDs cannot
/// name a job, so they get the same 404 as unknown ones.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<Job>> {
    let id = JobId::parse_str(&job_id).map_err(|_| CoreError::job_not_found(&job_id))?;

    let job = state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| CoreError::job_not_found(id))?;

    Ok(Json(job))
}
