//! File system errors

use std::path::Path;

use super::TriquetraError;

/// Creates a file not found error
pub fn not_found(path: &Path) -> TriquetraError {
    TriquetraError::FileNotFound {
        path: path.display().to_string(),
    }
}

/// Creates a file write failed error
pub fn write_failed(path: &Path, reason: impl ToString) -> TriquetraError {
    TriquetraError::FileWriteFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates an IO error
pub fn io_error(message: impl Into<String>) -> TriquetraError {
    TriquetraError::IoError {
        message: message.into(),
    }
}
