//! Error types for the media transfer tool
//!
//! This module defines the error types used throughout the application.
//! Resolution errors are soft (the item is skipped), copy errors abort the
//! request, and library deletion errors are only logged.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a readable location for a media item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The media source did not answer within the bounded wait
    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),

    /// The media source answered without a location
    #[error("No readable original available")]
    Unavailable,
}

/// Failure to copy a resolved source into the destination
#[derive(Error, Debug)]
#[error("Error copying file: {io}")]
pub struct CopyError {
    /// Resolved source path
    pub source_path: PathBuf,
    /// Destination path that was being written
    pub destination_path: PathBuf,
    /// Underlying I/O error
    #[source]
    pub io: std::io::Error,
}

/// Errors reported by a media library
#[derive(Error, Debug)]
pub enum LibraryError {
    /// One or more items could not be removed from the library
    #[error("Failed to delete {failed} of {total} item(s): {message}")]
    Deletion {
        failed: usize,
        total: usize,
        message: String,
    },

    /// The library root could not be read
    #[error("Library error: {0}")]
    Io(String),
}

/// Main error type for the media transfer tool
#[derive(Error, Debug)]
pub enum TransferError {
    /// The destination cannot be written; checked before the engine runs
    #[error("No access to destination '{}': {reason}", .path.display())]
    DestinationAccess { path: PathBuf, reason: String },

    /// A request is already executing on this engine
    #[error("Transfer already in progress")]
    AlreadyRunning,

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TransferError>;

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::IoError(err.to_string())
    }
}
