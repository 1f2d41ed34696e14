//! Client-side view of one submission.
//!
//! `idle → uploading → training → {completed | error}`, with a reset from
//! either terminal phase back to `idle`. Displayed progress only moves up
//! and stays below 100 until the relay reports completion.

use std::fmt;

use trainrelay_core::job::{
    Job, JobResult, JobStatus, PROGRESS_DONE, PROGRESS_TRAINING, PROGRESS_UPLOADING,
};
use trainrelay_core::types::JobId;

use crate::error::ClientError;

/// Progress added for every poll that does not end the job.
pub const POLL_PROGRESS_STEP: u8 = 5;

/// Highest progress shown before the relay confirms completion.
pub const POLL_PROGRESS_CAP: u8 = 95;

/// Message shown when the relay reports that training failed.
pub const TRAINING_FAILED_MESSAGE: &str = "Training failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Uploading,
    Training,
    Completed,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Training => "training",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a poll did to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Still running; progress advanced.
    Pending,
    Completed(JobResult),
    Failed(String),
}

/// State of a single submission as seen by the user.
#[derive(Debug, Clone)]
pub struct ClientMachine {
    phase: Phase,
    progress: u8,
    job_id: Option<JobId>,
    result: Option<JobResult>,
    error: Option<String>,
}

impl Default for ClientMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0,
            job_id: None,
            result: None,
            error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start an upload. Only valid from `idle`.
    pub fn begin_upload(&mut self) -> Result<(), ClientError> {
        self.expect_phase(Phase::Idle, "start an upload")?;
        self.phase = Phase::Uploading;
        self.raise_progress(PROGRESS_UPLOADING);
        Ok(())
    }

    /// The relay accepted the upload and issued `job_id`.
    pub fn upload_succeeded(&mut self, job_id: JobId) -> Result<(), ClientError> {
        self.expect_phase(Phase::Uploading, "accept an upload")?;
        self.phase = Phase::Training;
        self.job_id = Some(job_id);
        self.raise_progress(PROGRESS_TRAINING);
        Ok(())
    }

    /// The upload request failed; `message` is what the user sees.
    pub fn upload_failed(&mut self, message: impl Into<String>) -> Result<(), ClientError> {
        self.expect_phase(Phase::Uploading, "fail an upload")?;
        self.phase = Phase::Error;
        self.error = Some(message.into());
        Ok(())
    }

    /// Fold one status response into the machine.
    ///
    /// Responses arriving after a terminal phase was reached are ignored.
    pub fn observe(&mut self, job: &Job) -> PollStep {
        if self.phase != Phase::Training {
            return self.terminal_step();
        }

        match job.status {
            JobStatus::Completed => {
                let result = job.result.clone().unwrap_or_else(|| JobResult {
                    display_metric: serde_json::Value::Null,
                    message: String::new(),
                });
                self.phase = Phase::Completed;
                self.progress = PROGRESS_DONE;
                self.result = Some(result.clone());
                PollStep::Completed(result)
            }
            JobStatus::Error => {
                self.phase = Phase::Error;
                self.error = Some(TRAINING_FAILED_MESSAGE.to_string());
                PollStep::Failed(TRAINING_FAILED_MESSAGE.to_string())
            }
            JobStatus::Uploading | JobStatus::Training => {
                self.advance();
                PollStep::Pending
            }
        }
    }

    /// A poll request failed. The phase is kept and progress still advances.
    pub fn poll_failed(&mut self) -> PollStep {
        if self.phase != Phase::Training {
            return self.terminal_step();
        }
        self.advance();
        PollStep::Pending
    }

    /// Return to `idle` from a terminal phase.
    pub fn reset(&mut self) -> Result<(), ClientError> {
        if !self.phase.is_terminal() {
            return Err(ClientError::WrongPhase {
                action: "reset",
                phase: self.phase,
            });
        }
        *self = Self::new();
        Ok(())
    }

    fn advance(&mut self) {
        let next = self
            .progress
            .saturating_add(POLL_PROGRESS_STEP)
            .min(POLL_PROGRESS_CAP);
        self.raise_progress(next);
    }

    fn raise_progress(&mut self, value: u8) {
        self.progress = self.progress.max(value);
    }

    fn terminal_step(&self) -> PollStep {
        match (&self.phase, &self.result, &self.error) {
            (Phase::Completed, Some(result), _) => PollStep::Completed(result.clone()),
            (Phase::Error, _, Some(message)) => PollStep::Failed(message.clone()),
            _ => PollStep::Pending,
        }
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), ClientError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ClientError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }
}
