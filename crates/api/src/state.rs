use std::sync::Arc;

use trainrelay_cloud::storage::ObjectStorage;
use trainrelay_cloud::trainer::Trainer;
use trainrelay_store::SharedJobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job records, created once at startup and shared by every request.
    pub jobs: SharedJobStore,
    /// Object storage receiving uploaded datasets.
    pub storage: Arc<dyn ObjectStorage>,
    /// External trainer trigger.
    pub trainer: Arc<dyn Trainer>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
