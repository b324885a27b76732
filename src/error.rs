//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::io;
use std::path::Path;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::cache::{CacheEntry, PayloadStream};
use crate::models::ErrorResponse;

// == Error Codes ==
/// Stable identifiers surfaced to callers alongside every error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    Expired,
    InvalidInput,
    IoError,
    ParseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::Expired => "EXPIRED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::ParseError => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Metadata or payload file does not exist
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Override disabled and the entry is already on disk
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// Entry is present but past its expiry
    #[error("Entry expired: {0}")]
    Expired(String),

    /// Rejected before touching the filesystem
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Underlying filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Metadata file exists but is not a valid record
    #[error("Malformed metadata in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Record decoded but carries no expiry timestamps
    #[error("Record has no expiry timestamps: {0}")]
    MissingTimestamps(String),

    /// Metadata was written with `saved: false` after the payload write failed
    #[error("Payload for '{}' was not saved: {source}", .record.name)]
    PayloadNotSaved {
        record: Box<CacheEntry>,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Wraps an I/O error, folding a missing file into `NotFound`.
    pub fn from_io(source: io::Error, path: &Path) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            CacheError::NotFound(path.display().to_string())
        } else {
            CacheError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CacheError::NotFound(_) => ErrorCode::NotFound,
            CacheError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            CacheError::Expired(_) => ErrorCode::Expired,
            CacheError::InvalidInput(_) => ErrorCode::InvalidInput,
            CacheError::Io { .. } | CacheError::PayloadNotSaved { .. } => ErrorCode::IoError,
            CacheError::Parse { .. } | CacheError::MissingTimestamps(_) => ErrorCode::ParseError,
        }
    }
}

// == Read Failure ==
/// Failure of a streaming read, carrying whatever was obtained before the
/// failing step.
///
/// An expired entry still has its record and an open stream attached so the
/// caller can salvage stale data.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ReadFailure {
    #[source]
    pub error: CacheError,
    pub record: Option<CacheEntry>,
    pub stream: Option<PayloadStream>,
}

impl ReadFailure {
    pub fn bare(error: CacheError) -> Self {
        Self {
            error,
            record: None,
            stream: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.error.code()
    }
}

impl From<ReadFailure> for CacheError {
    fn from(failure: ReadFailure) -> Self {
        failure.error
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::Expired(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) => StatusCode::CONFLICT,
            CacheError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CacheError::Io { .. }
            | CacheError::Parse { .. }
            | CacheError::MissingTimestamps(_)
            | CacheError::PayloadNotSaved { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string(), self.code()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
