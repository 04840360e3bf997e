/// This module defines the error types for txtscout and how they are split between
/// errors that end a run and errors that only affect a single file.
///
/// # Fatal vs Per-Task Errors
///
/// Only configuration problems and pool setup failures are returned from
/// [`crate::search`] as `Err`:
/// ```rust,ignore
/// match search(&config) {
///     Ok(output) => // Matches plus any per-file failures,
///     Err(SearchError::ConfigError(msg)) => // Bad arguments or root directory,
///     Err(e) => // Could not start the worker pool,
/// }
/// ```
///
/// Everything that goes wrong while scanning one file travels as a value inside
/// that task's outcome instead:
/// ```rust,ignore
/// match handle.wait() {
///     TaskOutcome::Success(result) => // Matched or NoMatch,
///     TaskOutcome::Failure(SearchError::PermissionDenied(path)) => // Report and move on,
///     TaskOutcome::Failure(e) => // Report and move on,
/// }
/// ```
///
/// Errors never cross a thread boundary as a panic. A panic inside a task is caught
/// by the worker and converted into [`SearchError::TaskPanicked`].
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid UTF-8 in file {path} at line {line}")]
    EncodingError { path: PathBuf, line: usize },
    #[error("Task panicked while processing {task}: {message}")]
    TaskPanicked { task: String, message: String },
    #[error("Task interrupted by pool shutdown: {0}")]
    Interrupted(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Makes a path absolute without resolving symlinks, falling back to
/// the path as given when the working directory is unavailable.
pub fn absolute_path(original: &Path) -> PathBuf {
    std::path::absolute(original).unwrap_or_else(|_| original.to_path_buf())
}

impl SearchError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, line: usize) -> Self {
        Self::EncodingError {
            path: path.into(),
            line,
        }
    }

    pub fn task_panicked(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskPanicked {
            task: task.into(),
            message: message.into(),
        }
    }

    pub fn interrupted(task: impl Into<String>) -> Self {
        Self::Interrupted(task.into())
    }

    /// Classifies an I/O error raised while opening or reading `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::ReadError {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Returns true for errors that end the whole run rather than one task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::IoError(_))
    }
}
