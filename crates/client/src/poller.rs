//! Status polling loop.
//!
//! Polls are issued one at a time: the next tick is not awaited until the
//! previous request has resolved, and ticks missed while a request was in
//! flight are delayed rather than bunched up. The loop ends on a terminal
//! phase or when the [`CancellationToken`] fires, dropping its timer and any
//! request still in flight.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use trainrelay_core::job::JobResult;

use crate::api::RelayClient;
use crate::error::ClientError;
use crate::machine::{ClientMachine, Phase, PollStep};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(JobResult),
    Failed(String),
    Cancelled,
}

/// Poll the relay until the job in `machine` finishes or `cancel` fires.
///
/// `on_update` runs after every poll with the updated machine. The machine
/// must be in `training` with a known job id.
pub async fn poll_until_done<F>(
    client: &RelayClient,
    machine: &mut ClientMachine,
    every: Duration,
    cancel: &CancellationToken,
    mut on_update: F,
) -> Result<PollOutcome, ClientError>
where
    F: FnMut(&ClientMachine),
{
    let job_id = match (machine.phase(), machine.job_id()) {
        (Phase::Training, Some(id)) => id,
        (phase, _) => {
            return Err(ClientError::WrongPhase {
                action: "poll",
                phase,
            })
        }
    };

    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Polling cancelled");
                return Ok(PollOutcome::Cancelled);
            }
            polled = async {
                ticker.tick().await;
                client.status(job_id).await
            } => polled,
        };

        let step = match polled {
            Ok(job) => {
                tracing::debug!(job_id = %job_id, status = %job.status, "Polled job status");
                machine.observe(&job)
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Status poll failed");
                machine.poll_failed()
            }
        };

        on_update(machine);

        match step {
            PollStep::Pending => {}
            PollStep::Completed(result) => return Ok(PollOutcome::Completed(result)),
            PollStep::Failed(message) => return Ok(PollOutcome::Failed(message)),
        }
    }
}
