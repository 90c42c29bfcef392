//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// This enum encapsulates all possible errors that can occur during
/// core operations like folder scanning, renaming, and content decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// Represents a path that was expected to be a directory but was not.
    #[error("No such file or directory: {0}")]
    NotADirectory(PathBuf),

    /// Represents a modified-date string that could not be parsed back
    /// into a timestamp when writing it to disk.
    #[error("Invalid date string: {0}")]
    DateParse(String),

    /// Represents a failure to decode a media file's content.
    #[error("Failed to decode media content: {0}")]
    Decode(String),

    /// Represents a user-initiated cancellation of an operation.
    #[error("Operation was cancelled by the user")]
    Cancelled,
}

impl CoreError {
    /// Convenience constructor that attaches the offending path to an I/O error.
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CoreError::Io(err, path.into())
    }
}
