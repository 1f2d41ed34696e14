use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use trainrelay_core::error::CoreError;
use trainrelay_core::types::JobId;

/// Error returned by relay handlers.
///
/// Every variant renders as `{ "status": "error", "message", "code" }`;
/// upstream failures add `detail` and the `jobId` left in `error`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed multipart body or duplicate file field.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Object storage or the trainer failed while processing an upload.
    /// The message and detail are shown to the caller.
    #[error("{message}: {detail}")]
    Upstream {
        message: String,
        detail: String,
        job_id: Option<JobId>,
    },

    /// Logged in full, rendered as a generic 500.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status: &'static str,
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut detail = None;
        let mut job_id = None;

        let (status, code, message) = match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, .. } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} not found"),
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                err @ CoreError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "CONFLICT", err.to_string())
                }
                CoreError::Internal(msg) => internal(&msg),
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Upstream {
                message,
                detail: upstream_detail,
                job_id: failed_job,
            } => {
                detail = Some(upstream_detail);
                job_id = failed_job;
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR", message)
            }
            AppError::InternalError(msg) => internal(&msg),
        };

        let body = ErrorBody {
            status: "error",
            message,
            code,
            detail,
            job_id,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Log `msg` and hide it from the caller.
fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}
