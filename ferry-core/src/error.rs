//! Error types for ferry

use thiserror::Error;

/// Result type alias
pub type FerryResult<T> = Result<T, FerryError>;

/// Main error type
///
/// Backend adapters surface failures through the closed set
/// `NotFound` / `PermissionDenied` / `Unavailable`; the remaining
/// variants belong to the engine, the manager, and the integration
/// layer.
#[derive(Error, Debug)]
pub enum FerryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Mount not found: {0}")]
    MountNotFound(String),

    #[error("Content hash unavailable: {0}")]
    HashUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Command '{command}' failed: {stderr}")]
    External { command: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl FerryError {
    /// True for transient transport faults a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FerryError::Unavailable(_))
    }

    /// Map an `io::Error` raised for `path` into the closed fault set.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => FerryError::NotFound(path.to_string()),
            ErrorKind::PermissionDenied => FerryError::PermissionDenied(path.to_string()),
            ErrorKind::AlreadyExists => FerryError::AlreadyExists(path.to_string()),
            _ => FerryError::Io(err),
        }
    }
}
