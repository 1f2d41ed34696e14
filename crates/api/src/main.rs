//! `trainrelay-api` -- CSV training relay server.
//!
//! Accepts dataset uploads, hands them to object storage and the external
//! trainer, and serves job status until the trainer calls back. See
//! [`ServerConfig::from_env`] for the environment it reads.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trainrelay_api::config::{LogFormat, ServerConfig};
use trainrelay_api::router::build_app_router;
use trainrelay_api::state::AppState;
use trainrelay_cloud::storage::SupabaseStorage;
use trainrelay_cloud::trainer::WebhookTrainer;
use trainrelay_store::InMemoryJobStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let config = ServerConfig::from_env();
    tracing::info!(
        bucket = %config.storage.bucket,
        trainer = %config.trainer.webhook_url,
        callback_url = %config.trainer.callback_url,
        max_retries = config.trainer.max_retries,
        "Loaded relay configuration"
    );

    let app = build_app_router(build_state(&config), &config);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}:{}: {e}", config.host, config.port));
    tracing::info!(
        addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
        "Relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = shutdown_signal().await;
            tracing::info!(signal, "Shutting down, draining in-flight requests");
        })
        .await
        .expect("Server error");

    tracing::info!("Relay stopped");
}

/// Wire the job store and external service clients.
///
/// The store lives for the whole process; records are lost on restart.
fn build_state(config: &ServerConfig) -> AppState {
    let storage = SupabaseStorage::new(
        config.storage.url.clone(),
        config.storage.service_key.clone(),
        Duration::from_secs(config.storage.timeout_secs),
    )
    .expect("Failed to build storage HTTP client");

    let trainer = WebhookTrainer::new(
        config.trainer.webhook_url.clone(),
        Duration::from_secs(config.trainer.timeout_secs),
        config.trainer.retry_policy(),
    )
    .expect("Failed to build trainer HTTP client");

    AppState {
        jobs: Arc::new(InMemoryJobStore::new()),
        storage: Arc::new(storage),
        trainer: Arc::new(trainer),
        config: Arc::new(config.clone()),
    }
}

/// Install the global subscriber: `EnvFilter` plus pretty or JSON output.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trainrelay_api=debug,trainrelay_store=debug,trainrelay_cloud=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Resolve on SIGINT or (on Unix) SIGTERM, returning the signal name.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.expect("Failed to install Ctrl-C handler");
                "SIGINT"
            }
            _ = sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
        "SIGINT"
    }
}
