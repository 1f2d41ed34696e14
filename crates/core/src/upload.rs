//! Upload submission validation and object-storage key generation.
//!
//! Shared by the server (multipart handler) and the CLI client, which runs
//! the same checks before sending anything over the wire.

use std::path::Path;

use validator::ValidateEmail;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Multipart field carrying the dataset file.
pub const FILE_FIELD: &str = "csv";

/// Multipart field carrying the submitter's email address.
pub const EMAIL_FIELD: &str = "email";

/// Accepted file extension (case-insensitive).
pub const CSV_EXTENSION: &str = "csv";

/// Content type used when the dataset is written to object storage.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Name used for the storage key when the client sends no usable filename.
const FALLBACK_FILENAME: &str = "dataset.csv";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A file received from the client, before validation.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A submission that passed every check and may be turned into a job.
#[derive(Debug, Clone)]
pub struct UploadSubmission {
    pub filename: String,
    pub content: Vec<u8>,
    /// Trimmed email address.
    pub email: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check that `filename` carries a `.csv` extension.
pub fn validate_csv_filename(filename: &str) -> Result<(), CoreError> {
    let is_csv = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CSV_EXTENSION));

    if is_csv {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Only .csv files are accepted (got '{filename}')"
        )))
    }
}

/// Trim and check an email address. Returns the trimmed address.
pub fn validate_email(raw: &str) -> Result<String, CoreError> {
    let email = raw.trim().to_string();
    if email.is_empty() {
        return Err(CoreError::Validation("Email is required".into()));
    }
    if !email.validate_email() {
        return Err(CoreError::Validation(format!(
            "Invalid email address '{email}'"
        )));
    }
    Ok(email)
}

/// Validate a complete submission.
///
/// Runs before any job identifier exists, so a rejected submission never
/// leaves a record behind.
pub fn validate_submission(
    file: Option<DatasetFile>,
    email: Option<&str>,
) -> Result<UploadSubmission, CoreError> {
    let file = file.ok_or_else(|| CoreError::Validation("No CSV file uploaded".into()))?;
    validate_csv_filename(&file.filename)?;
    if file.content.is_empty() {
        return Err(CoreError::Validation("Uploaded CSV file is empty".into()));
    }

    let email = validate_email(email.unwrap_or_default())?;

    Ok(UploadSubmission {
        filename: file.filename,
        content: file.content,
        email,
    })
}

// ---------------------------------------------------------------------------
// Storage keys
// ---------------------------------------------------------------------------

/// Build a collision-resistant storage key: `<unix millis>_<sanitized name>`.
pub fn storage_key(filename: &str, now: Timestamp) -> String {
    format!("{}_{}", now.timestamp_millis(), sanitize_filename(filename))
}

/// Keep only the base name and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c: char| c == '.' || c == '_').is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
