use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Job lifecycle routes, mounted under `/api`.
///
/// The upload route carries its own body limit; the other routes keep
/// axum's default.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(handlers::upload::upload_dataset)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/status/{job_id}", get(handlers::status::get_status))
        .route("/callback", post(handlers::callback::receive_callback))
}
