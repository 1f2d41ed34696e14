use std::path::PathBuf;

use trainrelay_core::error::CoreError;

use crate::machine::Phase;

/// Shown when an upload fails without a usable message from the server.
pub const GENERIC_UPLOAD_ERROR: &str = "Upload failed. Check your connection and try again.";

/// Errors raised by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Local validation rejected the submission before any request was sent.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The dataset file could not be read.
    #[error("Cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The relay answered with an error status.
    #[error("Relay returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The request never produced a usable response.
    #[error("Relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The operation is not allowed in the current client phase.
    #[error("Cannot {action} while {phase}")]
    WrongPhase { action: &'static str, phase: Phase },
}

impl ClientError {
    /// Text suitable for the end user.
    ///
    /// Server messages are shown verbatim; transport failures collapse into
    /// [`GENERIC_UPLOAD_ERROR`] so no internal detail leaks to the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(CoreError::Validation(msg)) => msg.clone(),
            Self::Server { message, .. } => message.clone(),
            Self::File { path, source } => format!("Cannot read {}: {source}", path.display()),
            _ => GENERIC_UPLOAD_ERROR.to_string(),
        }
    }
}
