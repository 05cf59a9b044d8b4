//! Backend error type.

use thiserror::Error;

/// Errors that can occur while talking to the annotation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
