//! Handler for dataset uploads.
//!
//! Reads and validates the whole multipart submission before a job exists,
//! then runs the sequential, non-retrying pipeline: create the job, store
//! the dataset, mark it `training`, trigger the trainer. A failure after the
//! job was created leaves the job in `error` with the failure text.
//!
//! The pipeline runs on its own task so a request timeout or a client
//! disconnect cannot strand the job before it reaches `training` or `error`.

use axum::extract::{Multipart, State};
use axum::Json;
use trainrelay_cloud::storage::StorageError;
use trainrelay_cloud::trainer::{TrainerError, TrainingRequest};
use trainrelay_core::error::CoreError;
use trainrelay_core::job::JobPatch;
use trainrelay_core::types::{new_job_id, JobId};
use trainrelay_core::upload::{
    storage_key, validate_submission, DatasetFile, UploadSubmission, CSV_CONTENT_TYPE,
    EMAIL_FIELD, FILE_FIELD,
};

use crate::error::{AppError, AppResult};
use crate::response::UploadResponse;
use crate::state::AppState;

/// Failure after the job record exists.
#[derive(Debug, thiserror::Error)]
enum UploadFailure {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Trainer(#[from] TrainerError),

    #[error(transparent)]
    Store(#[from] CoreError),
}

impl UploadFailure {
    /// Short caller-facing summary; the full error goes in `detail`.
    fn summary(&self) -> &'static str {
        match self {
            Self::Storage(_) => "Failed to upload dataset to storage",
            Self::Trainer(_) => "Failed to start training",
            Self::Store(_) => "Failed to update job",
        }
    }
}

// ── Upload ───────────────────────────────────────────────────────────

/// POST /api/upload
///
/// Multipart fields: `csv` (file) and `email` (text).
pub async fn upload_dataset(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let submission = read_submission(multipart).await?;

    let job_id = new_job_id();
    state.jobs.create(job_id, &submission.email).await?;
    tracing::info!(
        job_id = %job_id,
        filename = %submission.filename,
        size = submission.content.len(),
        "Upload accepted, job created"
    );

    let pipeline = tokio::spawn(run_pipeline(state.clone(), job_id, submission));
    let outcome = pipeline.await.map_err(|e| {
        tracing::error!(job_id = %job_id, error = %e, "Upload task aborted");
        AppError::InternalError(format!("Upload task for job {job_id} aborted: {e}"))
    })?;

    if let Err(failure) = outcome {
        return Err(AppError::Upstream {
            message: failure.summary().to_string(),
            detail: failure.to_string(),
            job_id: Some(job_id),
        });
    }

    Ok(Json(UploadResponse {
        status: "success",
        message: "File uploaded and training started".to_string(),
        job_id,
    }))
}

/// Run [`process_upload`] and record any failure on the job.
async fn run_pipeline(
    state: AppState,
    job_id: JobId,
    submission: UploadSubmission,
) -> Result<(), UploadFailure> {
    let result = process_upload(&state, job_id, submission).await;

    if let Err(failure) = &result {
        tracing::error!(job_id = %job_id, error = %failure, "Upload processing failed");

        if let Err(e) = state
            .jobs
            .update(job_id, JobPatch::failed(failure.to_string()))
            .await
        {
            tracing::warn!(job_id = %job_id, error = %e, "Could not record upload failure on job");
        }
    }

    result
}

/// Store the dataset, advance the job, and trigger the trainer.
///
/// The file content is moved into the storage call and dropped when it
/// returns; it is never written to local disk.
async fn process_upload(
    state: &AppState,
    job_id: JobId,
    submission: UploadSubmission,
) -> Result<(), UploadFailure> {
    let bucket = state.config.storage.bucket.as_str();
    let key = storage_key(&submission.filename, chrono::Utc::now());

    let stored = state
        .storage
        .upload(bucket, &key, submission.content, CSV_CONTENT_TYPE)
        .await?;
    let csv_url = state.storage.public_url(bucket, &stored.path);
    tracing::info!(job_id = %job_id, csv_url = %csv_url, "Dataset stored");

    state.jobs.update(job_id, JobPatch::training()).await?;

    let request = TrainingRequest {
        csv_url,
        email: submission.email,
        job_id,
        callback_url: job_callback_url(&state.config.trainer.callback_url, job_id),
    };
    state.trainer.trigger(&request).await?;

    Ok(())
}

/// The callback URL handed to the trainer for one job.
///
/// The trainer does not send the job id back, so it rides in the query
/// string.
fn job_callback_url(base: &str, job_id: JobId) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}jobId={job_id}")
}

// ── Multipart ────────────────────────────────────────────────────────

/// Collect the `csv` and `email` fields and validate them together.
async fn read_submission(mut multipart: Multipart) -> AppResult<UploadSubmission> {
    let mut file: Option<DatasetFile> = None;
    let mut email: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                if file.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one CSV file may be uploaded".to_string(),
                    ));
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                file = Some(DatasetFile {
                    filename,
                    content: content.to_vec(),
                });
            }
            Some(EMAIL_FIELD) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                email = Some(value);
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unexpected multipart field");
            }
        }
    }

    Ok(validate_submission(file, email.as_deref())?)
}
