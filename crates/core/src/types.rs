/// Jobs are keyed by a random (v4) UUID generated at upload time.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh, collision-free job identifier.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4()
}
