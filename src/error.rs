//! Error type shared by the path jail, the file store and the `/edit` handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::io;
use thiserror::Error;

/// Errors that can occur while resolving or operating on served files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Request path escapes the served root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// File or directory does not exist (or is the wrong kind of entry)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Listing target exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Delete target is on the protected list
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Underlying filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Request is missing a required field
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl StoreError {
    /// Convert a StoreError to an HTTP StatusCode.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::NotADirectory(_) => StatusCode::CONFLICT,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Map an `io::Error` from a filesystem call, turning "not found" into
    /// [`StoreError::NotFound`] for the given display path.
    pub(crate) fn from_io(err: io::Error, path: &str) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
