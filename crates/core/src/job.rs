//! Job record, status lifecycle, and the rules for mutating a record.
//!
//! A job moves forward only: `uploading → training → {completed | error}`.
//! [`Job::apply`] is the single place where those rules are enforced; the
//! store calls it under its write lock so every mutation goes through it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Progress recorded when the job is created (file received, not yet stored).
pub const PROGRESS_UPLOADING: u8 = 10;

/// Progress recorded once the dataset is in object storage.
pub const PROGRESS_TRAINING: u8 = 35;

/// Progress recorded when the trainer reports a terminal result.
pub const PROGRESS_DONE: u8 = 100;

/// Fallback error text when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Record created; the dataset is being pushed to object storage.
    Uploading,
    /// Dataset stored and the external trainer has been (or is being) triggered.
    Training,
    /// The trainer reported success.
    Completed,
    /// Upload, trigger, or training failed.
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Training => "training",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// `completed` and `error` are terminal; nothing moves out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Position in the forward-only ordering. Both terminal states share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Uploading => 0,
            Self::Training => 1,
            Self::Completed | Self::Error => 2,
        }
    }

    /// Whether a record currently in `self` may move to `next`.
    ///
    /// Staying in the same non-terminal state is allowed (progress-only
    /// updates). Only `training` may complete; `error` is reachable from
    /// either non-terminal state. Terminal states accept nothing;
    /// re-delivery of the same terminal outcome is handled by [`Job::apply`]
    /// as a no-op.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (from, Self::Completed) => from == Self::Training,
            (from, to) => to.rank() >= from.rank(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Outcome reported by the trainer for a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Free-form display metric (string such as `"0.92 R²"`, a number, or an
    /// object of named metrics).
    #[serde(default)]
    pub display_metric: serde_json::Value,
    /// Human-readable message from the trainer.
    #[serde(default)]
    pub message: String,
}

/// One upload-to-result lifecycle as served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Informational percentage; not a measure of real work done.
    pub progress: u8,
    pub email: String,
    /// Present if and only if `status == completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Present if and only if `status == error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// A freshly created record: `uploading` at [`PROGRESS_UPLOADING`].
    pub fn new(job_id: JobId, email: impl Into<String>, now: Timestamp) -> Self {
        Self {
            job_id,
            status: JobStatus::Uploading,
            progress: PROGRESS_UPLOADING,
            email: email.into(),
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge `patch` into the record.
    ///
    /// Returns `Ok(true)` when the record changed and `Ok(false)` when the
    /// patch re-states the terminal outcome the record already holds
    /// (duplicate callback delivery). Any other attempt to leave a terminal
    /// state, or to move backwards, fails with
    /// [`CoreError::InvalidTransition`] and leaves the record untouched.
    pub fn apply(&mut self, patch: JobPatch, now: Timestamp) -> Result<bool, CoreError> {
        let target = patch.status.unwrap_or(self.status);

        if self.status.is_terminal() {
            if target == self.status && self.matches_terminal(&patch) {
                return Ok(false);
            }
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        if !self.status.can_transition_to(target) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        match target {
            JobStatus::Completed => {
                let result = patch.result.ok_or_else(|| {
                    CoreError::Validation("A completed job requires a result".into())
                })?;
                self.result = Some(result);
                self.error_message = None;
            }
            JobStatus::Error => {
                self.result = None;
                self.error_message = Some(
                    patch
                        .error_message
                        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
                );
            }
            JobStatus::Uploading | JobStatus::Training => {
                if patch.result.is_some() {
                    return Err(CoreError::Validation(
                        "A result may only be attached to a completed job".into(),
                    ));
                }
            }
        }

        self.status = target;
        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress.min(PROGRESS_DONE));
        }
        self.updated_at = now;
        Ok(true)
    }

    fn matches_terminal(&self, patch: &JobPatch) -> bool {
        match self.status {
            JobStatus::Completed => patch.result.as_ref() == self.result.as_ref(),
            JobStatus::Error => {
                patch.error_message.is_none() || patch.error_message == self.error_message
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Partial update merged into a [`Job`] by [`Job::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub result: Option<JobResult>,
    pub error_message: Option<String>,
}

impl JobPatch {
    /// Dataset stored, trainer about to be triggered.
    pub fn training() -> Self {
        Self {
            status: Some(JobStatus::Training),
            progress: Some(PROGRESS_TRAINING),
            ..Default::default()
        }
    }

    /// Trainer reported success.
    pub fn completed(result: JobResult) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(PROGRESS_DONE),
            result: Some(result),
            ..Default::default()
        }
    }

    /// Upload, trigger or training failed. Progress is left as is.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
