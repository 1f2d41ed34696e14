pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /upload              POST   multipart dataset + email, returns jobId
/// /status/{job_id}     GET    current job record
/// /callback            POST   result notification from the trainer
/// ```
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    jobs::router(max_upload_bytes)
}
