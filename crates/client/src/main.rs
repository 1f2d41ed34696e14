//! `trainrelay` -- submit a CSV dataset to the relay and wait for the result.
//!
//! ```text
//! trainrelay data.csv --email a@b.com
//! ```
//!
//! Exit status is 0 when training completes, 1 on any failure and 130 when
//! interrupted with Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use trainrelay_client::api::{RelayClient, DEFAULT_TIMEOUT};
use trainrelay_client::form::prepare_submission;
use trainrelay_client::machine::ClientMachine;
use trainrelay_client::poller::{poll_until_done, PollOutcome};

#[derive(Parser)]
#[command(name = "trainrelay", about = "Upload a CSV dataset for training and wait for the result")]
struct Cli {
    /// CSV file to upload
    file: PathBuf,

    /// Address the result is associated with
    #[arg(long)]
    email: String,

    /// Relay base URL
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:5000")]
    api_url: String,

    /// Seconds between status polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 3)]
    poll_interval: u64,
}

const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trainrelay_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let submission = match prepare_submission(&cli.file, &cli.email).await {
        Ok(submission) => submission,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let client = match RelayClient::new(cli.api_url.clone(), DEFAULT_TIMEOUT) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% {msg}")
            .expect("Progress template is valid")
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut machine = ClientMachine::new();
    if let Err(e) = machine.begin_upload() {
        tracing::error!(error = %e, "Client state rejected upload");
        return ExitCode::FAILURE;
    }
    render(&bar, &machine);

    match client.upload(submission).await {
        Ok(job_id) => {
            tracing::info!(job_id = %job_id, api_url = %client.base_url(), "Training started");
            if let Err(e) = machine.upload_succeeded(job_id) {
                tracing::error!(error = %e, "Client state rejected job id");
                return ExitCode::FAILURE;
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "Upload failed");
            let message = e.user_message();
            if let Err(e) = machine.upload_failed(message.clone()) {
                tracing::error!(error = %e, "Client state rejected upload failure");
            }
            bar.abandon_with_message(message);
            return ExitCode::FAILURE;
        }
    }
    render(&bar, &machine);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let outcome = poll_until_done(
        &client,
        &mut machine,
        Duration::from_secs(cli.poll_interval.max(1)),
        &cancel,
        |m| render(&bar, m),
    )
    .await;

    match outcome {
        Ok(PollOutcome::Completed(result)) => {
            bar.finish_with_message("completed");
            let metric = match &result.display_metric {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => "-".to_string(),
                other => other.to_string(),
            };
            println!("Result: {metric}");
            if !result.message.is_empty() {
                println!("{}", result.message);
            }
            ExitCode::SUCCESS
        }
        Ok(PollOutcome::Failed(message)) => {
            bar.abandon_with_message(message);
            ExitCode::FAILURE
        }
        Ok(PollOutcome::Cancelled) => {
            bar.abandon_with_message("cancelled");
            ExitCode::from(INTERRUPTED)
        }
        Err(e) => {
            bar.abandon_with_message(e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn render(bar: &ProgressBar, machine: &ClientMachine) {
    bar.set_position(u64::from(machine.progress()));
    bar.set_message(machine.phase().as_str());
}
