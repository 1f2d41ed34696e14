#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use trainrelay_api::config::{ServerConfig, StorageConfig, TrainerConfig};
use trainrelay_api::router::build_app_router;
use trainrelay_api::state::AppState;
use trainrelay_cloud::storage::{ObjectStorage, StorageError, StoredObject};
use trainrelay_cloud::trainer::{Trainer, TrainerError, TrainingRequest};
use trainrelay_store::InMemoryJobStore;

pub const BOUNDARY: &str = "trainrelay-test-boundary";
pub const CALLBACK_URL: &str = "http://relay.test/api/callback";

// ---------------------------------------------------------------------------
// Fake external services
// ---------------------------------------------------------------------------

/// How the fake storage answers uploads.
#[derive(Debug, Clone, Copy)]
pub enum StorageBehavior {
    Succeed,
    Fail,
    /// Sleep, then fail like `Fail`.
    SlowFail(Duration),
}

/// One recorded upload.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub bucket: String,
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct FakeStorage {
    behavior: StorageBehavior,
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

impl FakeStorage {
    pub fn new(behavior: StorageBehavior) -> Self {
        Self {
            behavior,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        match self.behavior {
            StorageBehavior::Succeed => {
                self.uploads.lock().unwrap().push(RecordedUpload {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    bytes,
                    content_type: content_type.to_string(),
                });
                Ok(StoredObject {
                    path: key.to_string(),
                })
            }
            StorageBehavior::Fail => Err(StorageError::Api {
                status: 503,
                body: "storage unavailable".into(),
            }),
            StorageBehavior::SlowFail(delay) => {
                tokio::time::sleep(delay).await;
                Err(StorageError::Api {
                    status: 503,
                    body: "storage unavailable".into(),
                })
            }
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://storage.test/public/{bucket}/{path}")
    }
}

/// How the fake trainer answers triggers.
#[derive(Debug, Clone, Copy)]
pub enum TrainerBehavior {
    Accept,
    Timeout,
    Reject,
}

pub struct FakeTrainer {
    behavior: TrainerBehavior,
    pub requests: Mutex<Vec<TrainingRequest>>,
}

impl FakeTrainer {
    pub fn new(behavior: TrainerBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TrainingRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Trainer for FakeTrainer {
    async fn trigger(&self, request: &TrainingRequest) -> Result<(), TrainerError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.behavior {
            TrainerBehavior::Accept => Ok(()),
            TrainerBehavior::Timeout => Err(TrainerError::Timeout(Duration::from_secs(10))),
            TrainerBehavior::Reject => Err(TrainerError::HttpStatus {
                status: 500,
                body: "workflow crashed".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        storage: StorageConfig {
            url: "https://storage.test".to_string(),
            service_key: "test-key".to_string(),
            bucket: "datasets".to_string(),
            timeout_secs: 5,
        },
        trainer: TrainerConfig {
            webhook_url: "https://trainer.test/train".to_string(),
            timeout_secs: 10,
            max_retries: 0,
            callback_url: CALLBACK_URL.to_string(),
        },
    }
}

/// The router plus handles on everything behind it.
pub struct TestApp {
    pub router: Router,
    pub jobs: Arc<InMemoryJobStore>,
    pub storage: Arc<FakeStorage>,
    pub trainer: Arc<FakeTrainer>,
}

/// Build the full application router (same middleware stack as
/// production) over fake external services.
pub fn build_test_app(storage: StorageBehavior, trainer: TrainerBehavior) -> TestApp {
    build_test_app_with_config(test_config(), storage, trainer)
}

/// Same as [`build_test_app`] with a caller-supplied config.
pub fn build_test_app_with_config(
    config: ServerConfig,
    storage: StorageBehavior,
    trainer: TrainerBehavior,
) -> TestApp {
    let jobs = Arc::new(InMemoryJobStore::new());
    let storage = Arc::new(FakeStorage::new(storage));
    let trainer = Arc::new(FakeTrainer::new(trainer));

    let state = AppState {
        jobs: jobs.clone(),
        storage: storage.clone(),
        trainer: trainer.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        jobs,
        storage,
        trainer,
    }
}

/// App whose storage and trainer both succeed.
pub fn healthy_app() -> TestApp {
    build_test_app(StorageBehavior::Succeed, TrainerBehavior::Accept)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, "application/json", body.to_string().into_bytes()).await
}

pub async fn post_raw(
    app: &Router,
    uri: &str,
    content_type: &str,
    body: Vec<u8>,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Encode a multipart body with an optional `csv` file and `email` field.
pub fn multipart_body(file: Option<(&str, &[u8])>, email: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some((filename, content)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"csv\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }

    if let Some(email) = email {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"email\"\r\n\r\n{email}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart upload to `/api/upload`.
pub async fn post_upload(
    app: &Router,
    file: Option<(&str, &[u8])>,
    email: Option<&str>,
) -> Response<Body> {
    post_raw(
        app,
        "/api/upload",
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        multipart_body(file, email),
    )
    .await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub const SAMPLE_CSV: &[u8] = b"feature,target\n1,0.5\n2,0.9\n3,1.4\n";
