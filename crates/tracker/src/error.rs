//! Adapter construction errors.

use backlog::SyncError;
use thiserror::Error;

/// Failures while setting up a [`crate::TrackerClient`].
///
/// Per-call failures are reported as [`backlog::ServiceError`] instead.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid service base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Project name must not be empty")]
    MissingProject,

    #[error("Credential environment variable '{var}' is not set or empty")]
    MissingToken { var: String },

    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

impl From<TrackerError> for SyncError {
    fn from(err: TrackerError) -> Self {
        SyncError::configuration(err.to_string())
    }
}
