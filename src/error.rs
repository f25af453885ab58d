//! Error types for the dropfs library.

use thiserror::Error;

use crate::api::error::ApiErrorKind;

/// Main error type for dropfs operations.
#[derive(Error, Debug)]
pub enum DropboxError {
    /// The remote path does not exist.
    #[error("open {path}: no such file or directory")]
    NotFound { path: String },

    /// A bounded listing found nothing to return.
    #[error("end of sequence")]
    EndOfSequence,

    /// Operation attempted on a handle in the wrong state.
    #[error("invalid handle state: {0}")]
    InvalidHandleState(String),

    /// Dropbox API returned a structured error.
    #[error("API error ({status}): {summary}")]
    Api { status: u16, summary: String },

    /// HTTP request failed with status code and no structured body.
    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// Network request error.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Stream I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background upload task panicked or was cancelled.
    #[error("upload task failed: {0}")]
    UploadTask(String),

    /// Metadata returned by the server could not be projected.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DropboxError {
    /// Check whether this error means the remote path does not exist.
    ///
    /// True for the canonical [`DropboxError::NotFound`] and for raw API
    /// errors whose summary reports a missing path.
    pub fn is_not_found(&self) -> bool {
        match self {
            DropboxError::NotFound { .. } => true,
            DropboxError::Api { summary, .. } => ApiErrorKind::from_summary(summary).is_not_found(),
            _ => false,
        }
    }

    /// Classify an API error, if this is one.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            DropboxError::Api { summary, .. } => Some(ApiErrorKind::from_summary(summary)),
            _ => None,
        }
    }
}

/// Result type alias for dropfs operations.
pub type Result<T> = std::result::Result<T, DropboxError>;
