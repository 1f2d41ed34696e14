//! Result notifications sent by the external trainer.
//!
//! The trainer is outside our control and its payloads vary: status may be
//! `"completed"` or `"Complete"`, and the metric may arrive as
//! `display_metric`, `accuracy_formatted`, `details` or a `metrics` object.
//! [`CallbackPayload::into_update`] folds all of that into a [`JobPatch`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::job::{JobPatch, JobResult, JobStatus, PROGRESS_DONE};
use crate::types::JobId;

/// Error text stored when the trainer reports failure without a message.
pub const DEFAULT_TRAINING_ERROR: &str = "Training failed";

/// Raw callback body. Every field is optional so that shape problems surface
/// from [`CallbackPayload::into_update`] rather than from deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackPayload {
    #[serde(default, rename = "jobId", alias = "job_id")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub display_metric: Option<Value>,
    #[serde(default)]
    pub accuracy_formatted: Option<Value>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A callback resolved to the job it targets and the change it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
    pub patch: JobPatch,
}

impl CallbackPayload {
    /// Use `job_id` when the body carries no job id of its own.
    ///
    /// The trainer does not echo the job id; the relay hands it out in the
    /// callback URL's query string instead.
    pub fn or_job_id(mut self, job_id: Option<String>) -> Self {
        let body_has_id = self
            .job_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !body_has_id {
            self.job_id = job_id;
        }
        self
    }

    /// Resolve the payload into a store update.
    ///
    /// Fails with [`CoreError::Validation`] when the job id is missing or not
    /// a UUID, or when the status is not a terminal outcome.
    pub fn into_update(self) -> Result<CallbackUpdate, CoreError> {
        let raw_id = self
            .job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::Validation("Callback is missing jobId".into()))?;

        let job_id = JobId::parse_str(raw_id).map_err(|_| {
            CoreError::Validation(format!("Callback jobId '{raw_id}' is not a valid job id"))
        })?;

        let status = parse_callback_status(self.status.as_deref())?;

        let patch = match status {
            JobStatus::Completed => JobPatch::completed(JobResult {
                display_metric: self
                    .display_metric
                    .or(self.accuracy_formatted)
                    .or(self.details)
                    .or(self.metrics.map(render_metrics))
                    .unwrap_or(Value::Null),
                message: self.message.unwrap_or_default(),
            }),
            _ => JobPatch::failed(
                self.message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TRAINING_ERROR.to_string()),
            )
            .with_progress(PROGRESS_DONE),
        };

        Ok(CallbackUpdate {
            job_id,
            status,
            patch,
        })
    }
}

/// Flatten a metrics object into `"name: value, ..."` text, sorted by name.
/// Other shapes pass through unchanged.
fn render_metrics(metrics: Value) -> Value {
    match metrics {
        Value::Object(map) => {
            let mut pairs: Vec<String> = map
                .iter()
                .map(|(name, value)| match value {
                    Value::String(s) => format!("{name}: {s}"),
                    other => format!("{name}: {other}"),
                })
                .collect();
            pairs.sort();
            Value::String(pairs.join(", "))
        }
        other => other,
    }
}

/// Map the trainer's status string to a terminal [`JobStatus`].
///
/// A missing or blank status means success.
pub fn parse_callback_status(raw: Option<&str>) -> Result<JobStatus, CoreError> {
    let Some(value) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(JobStatus::Completed);
    };

    match value.to_ascii_lowercase().as_str() {
        "complete" | "completed" | "success" | "done" => Ok(JobStatus::Completed),
        "error" | "failed" | "failure" => Ok(JobStatus::Error),
        other => Err(CoreError::Validation(format!(
            "Unsupported callback status '{other}'"
        ))),
    }
}
