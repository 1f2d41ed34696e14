use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trainrelay_core::error::CoreError;
use trainrelay_core::job::{Job, JobPatch};
use trainrelay_core::types::JobId;

use crate::JobStore;

/// Process-local job store.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Records live until the process exits.
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Return the current number of records.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Clone every record, oldest first.
    pub async fn snapshot(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, id: JobId, email: &str) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(CoreError::Conflict(format!("Job {id} already exists")));
        }

        let job = Job::new(id, email, chrono::Utc::now());
        jobs.insert(id, job.clone());
        tracing::debug!(job_id = %id, "Job record created");
        Ok(job)
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, CoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or_else(|| CoreError::job_not_found(id))?;

        let changed = job.apply(patch, chrono::Utc::now())?;
        if changed {
            tracing::debug!(job_id = %id, status = %job.status, progress = job.progress, "Job record updated");
        } else {
            tracing::debug!(job_id = %id, status = %job.status, "Duplicate terminal update ignored");
        }
        Ok(job.clone())
    }
}
