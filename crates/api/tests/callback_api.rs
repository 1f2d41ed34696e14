//! Integration tests for `POST /api/callback`.
//!
//! The endpoint acknowledges every delivery it can; these tests check that
//! the job record changes only when the callback is a valid forward move.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, healthy_app, post_json, post_raw, post_upload, SAMPLE_CSV};
use serde_json::json;
use trainrelay_core::job::{JobPatch, JobStatus};
use trainrelay_core::types::{new_job_id, JobId};
use trainrelay_store::JobStore;

/// Create a job that has reached `training` through the real upload route.
async fn training_job(app: &common::TestApp) -> String {
    let json = body_json(
        post_upload(
            &app.router,
            Some(("sales.csv", SAMPLE_CSV)),
            Some("analyst@example.com"),
        )
        .await,
    )
    .await;
    json["jobId"].as_str().unwrap().to_string()
}

async fn status_of(app: &common::TestApp, job_id: &str) -> serde_json::Value {
    body_json(get(&app.router, &format!("/api/status/{job_id}")).await).await
}

fn assert_ack(json: &serde_json::Value) {
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Callback processed");
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completion_callback_finishes_job() {
    let app = healthy_app();
    let job_id = training_job(&app).await;

    let response = post_json(
        &app.router,
        "/api/callback",
        json!({
            "jobId": job_id,
            "status": "completed",
            "display_metric": "0.92 R²",
            "message": "Model trained"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["progress"], 100);
    assert_eq!(status["result"]["display_metric"], "0.92 R²");
    assert_eq!(status["result"]["message"], "Model trained");
    assert!(status.get("errorMessage").is_none());
}

#[tokio::test]
async fn duplicate_completion_is_idempotent() {
    let app = healthy_app();
    let job_id = training_job(&app).await;
    let body = json!({
        "jobId": job_id,
        "status": "completed",
        "display_metric": "0.92 R²",
        "message": "Model trained"
    });

    post_json(&app.router, "/api/callback", body.clone()).await;
    let first = status_of(&app, &job_id).await;

    let response = post_json(&app.router, "/api/callback", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    let second = status_of(&app, &job_id).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn capitalised_status_and_metrics_fallback_are_accepted() {
    let app = healthy_app();
    let job_id = training_job(&app).await;

    post_json(
        &app.router,
        "/api/callback",
        json!({
            "job_id": job_id,
            "status": "Complete",
            "metrics": { "r2": 0.87, "mae": 1.2 }
        }),
    )
    .await;

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["display_metric"], "mae: 1.2, r2: 0.87");
}

#[tokio::test]
async fn missing_status_means_completed() {
    let app = healthy_app();
    let job_id = training_job(&app).await;

    post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": job_id, "accuracy_formatted": "91%" }),
    )
    .await;

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["display_metric"], "91%");
}

// ---------------------------------------------------------------------------
// Trainer bodies without a job id
// ---------------------------------------------------------------------------

/// Path and query of the callback URL the trainer was given.
fn handed_out_callback(app: &common::TestApp) -> String {
    let requests = app.trainer.requests();
    let url = &requests.last().expect("trainer was triggered").callback_url;
    url.strip_prefix("http://relay.test")
        .expect("callback URL is on the relay")
        .to_string()
}

#[tokio::test]
async fn trainer_body_without_job_id_completes_job_via_callback_url() {
    let app = healthy_app();
    let job_id = training_job(&app).await;
    let callback = handed_out_callback(&app);
    assert_eq!(callback, format!("/api/callback?jobId={job_id}"));

    let response = post_json(
        &app.router,
        &callback,
        json!({
            "status": "Complete",
            "metrics": { "accuracy": 0.912 },
            "accuracy_formatted": "91.20%",
            "message": "High-precision model trained! Accuracy boosted to 91.20%."
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["display_metric"], "91.20%");
    assert_eq!(
        status["result"]["message"],
        "High-precision model trained! Accuracy boosted to 91.20%."
    );
}

#[tokio::test]
async fn trainer_error_body_without_job_id_fails_job_via_callback_url() {
    let app = healthy_app();
    let job_id = training_job(&app).await;
    let callback = handed_out_callback(&app);

    post_json(
        &app.router,
        &callback,
        json!({ "status": "Error", "message": "Download failed: 404" }),
    )
    .await;

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["errorMessage"], "Download failed: 404");
}

// ---------------------------------------------------------------------------
// Failure reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn error_callback_records_failure() {
    let app = healthy_app();
    let job_id = training_job(&app).await;

    post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": job_id, "status": "error", "message": "Target column missing" }),
    )
    .await;

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["errorMessage"], "Target column missing");
    assert!(status.get("result").is_none());
}

#[tokio::test]
async fn completion_after_error_is_ignored() {
    let app = healthy_app();
    let job_id = training_job(&app).await;

    post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": job_id, "status": "failed" }),
    )
    .await;

    let response = post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": job_id, "status": "completed", "display_metric": "0.99" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["errorMessage"], "Training failed");
}

// ---------------------------------------------------------------------------
// Deliveries that change nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_job_is_acknowledged_without_creating_it() {
    let app = healthy_app();
    let id = new_job_id();

    let response = post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": id, "status": "completed", "display_metric": "0.5" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    assert!(app.jobs.get(id).await.unwrap().is_none());
    assert!(app.jobs.is_empty().await);
}

#[tokio::test]
async fn malformed_body_is_acknowledged_and_ignored() {
    let app = healthy_app();
    let job_id = training_job(&app).await;
    let before = status_of(&app, &job_id).await;

    let response = post_raw(
        &app.router,
        "/api/callback",
        "application/json",
        b"{not json".to_vec(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    assert_eq!(status_of(&app, &job_id).await, before);
}

#[tokio::test]
async fn missing_job_id_is_acknowledged() {
    let app = healthy_app();

    let response = post_json(&app.router, "/api/callback", json!({ "status": "completed" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);
}

#[tokio::test]
async fn unsupported_status_leaves_job_untouched() {
    let app = healthy_app();
    let job_id = training_job(&app).await;

    post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": job_id, "status": "running" }),
    )
    .await;

    let status = status_of(&app, &job_id).await;
    assert_eq!(status["status"], "training");
}

#[tokio::test]
async fn completion_for_job_still_uploading_is_ignored() {
    let app = healthy_app();
    let id: JobId = new_job_id();
    app.jobs.create(id, "analyst@example.com").await.unwrap();

    let response = post_json(
        &app.router,
        "/api/callback",
        json!({ "jobId": id, "status": "completed", "display_metric": "0.7" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ack(&body_json(response).await);

    let job = app.jobs.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Uploading);
    assert!(job.result.is_none());

    // The pipeline can still move it forward.
    assert!(app.jobs.update(id, JobPatch::training()).await.is_ok());
}
