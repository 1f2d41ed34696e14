//! Job record storage.
//!
//! Handlers depend only on the [`JobStore`] trait so a persistent backend
//! can replace [`InMemoryJobStore`] without touching handler logic.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use trainrelay_core::error::CoreError;
use trainrelay_core::job::{Job, JobPatch};
use trainrelay_core::types::JobId;

pub use memory::InMemoryJobStore;

/// Shared handle to the process-wide job store.
pub type SharedJobStore = Arc<dyn JobStore>;

/// Keyed storage for job records.
///
/// Implementations must be safe for concurrent insertion, lookup and
/// mutation from independent requests.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `uploading` record for `id`.
    ///
    /// Fails with [`CoreError::Conflict`] if `id` is already present.
    async fn create(&self, id: JobId, email: &str) -> Result<Job, CoreError>;

    /// Fetch a snapshot of the record for `id`, if any.
    async fn get(&self, id: JobId) -> Result<Option<Job>, CoreError>;

    /// Merge `patch` into the record for `id` and return the updated record.
    ///
    /// Fails with [`CoreError::NotFound`] for an unknown id and with
    /// [`CoreError::InvalidTransition`] when the patch would move the job
    /// out of a terminal state or backwards.
    async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, CoreError>;
}
