//! Local checks on a submission before anything is sent.

use std::path::Path;

use trainrelay_core::upload::{
    validate_csv_filename, validate_email, validate_submission, DatasetFile, UploadSubmission,
};

use crate::error::ClientError;

/// Validate `email` and the file at `path`, then read the file.
///
/// The name and email are checked before the file is opened, so a wrong
/// extension or a missing address never touches the disk or the network.
pub async fn prepare_submission(path: &Path, email: &str) -> Result<UploadSubmission, ClientError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    validate_csv_filename(&filename)?;
    let email = validate_email(email)?;

    let content = tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::File {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(validate_submission(
        Some(DatasetFile { filename, content }),
        Some(&email),
    )?)
}
