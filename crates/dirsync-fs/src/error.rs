//! Sandbox error types.
//!
//! The display strings double as wire response lines: the session
//! processor converts any of these into a single line of response text.

use std::io;
use thiserror::Error;

/// Sandbox error type.
#[derive(Debug, Error)]
pub enum FsError {
    /// A path segment does not exist.
    #[error("Error : {0} doesn't exist")]
    NotFound(String),

    /// The target path already exists.
    #[error("Error : {0} already exists")]
    AlreadyExists(String),

    /// The path would escape the home boundary.
    #[error("Error : Insufficient permissions")]
    PermissionDenied,

    /// Underlying I/O failure.
    #[error("Error : {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }
}

/// Sandbox result type.
pub type FsResult<T> = Result<T, FsError>;
