//! Error Module
//!
//! Defines error types and result types used throughout the random image API.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the random image API
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("System error: {0}")]
    SystemError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The image directory exists but holds no file with an allowed
    /// extension. Distinct from the directory being unreadable.
    #[error("no image files found in {}, add image files to this directory", .dir.display())]
    EmptyDirectory { dir: PathBuf },

    /// The image directory could not be listed at all (missing, permission
    /// denied, not a directory).
    #[error("failed to read image directory {}: {cause}", .dir.display())]
    DirectoryUnreadable { dir: PathBuf, cause: String },
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::IoError(err.to_string())
    }
}

impl From<hyper::Error> for ApiError {
    fn from(err: hyper::Error) -> Self {
        ApiError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ApiError {
    fn from(err: serde_yaml::Error) -> Self {
        ApiError::SerializationError(err.to_string())
    }
}

/// Result type alias for the random image API
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_unreadable_are_distinct() {
        let empty = ApiError::EmptyDirectory {
            dir: PathBuf::from("/tmp/images"),
        };
        let unreadable = ApiError::DirectoryUnreadable {
            dir: PathBuf::from("/tmp/images"),
            cause: "No such file or directory".to_string(),
        };

        assert!(matches!(empty, ApiError::EmptyDirectory { .. }));
        assert!(matches!(unreadable, ApiError::DirectoryUnreadable { .. }));
        assert!(empty.to_string().contains("/tmp/images"));
        assert!(unreadable.to_string().contains("No such file or directory"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = io.into();
        assert!(matches!(err, ApiError::IoError(_)));
    }
}
