//! Configuration errors

use std::path::Path;

use super::TriquetraError;

/// Creates a config parse failed error
pub fn parse_failed(path: &Path, reason: impl ToString) -> TriquetraError {
    TriquetraError::ConfigParseFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates an invalid config error
pub fn invalid(message: impl Into<String>) -> TriquetraError {
    TriquetraError::ConfigInvalid {
        message: message.into(),
    }
}

/// Creates a config read failed error
pub fn read_failed(path: &Path, reason: impl ToString) -> TriquetraError {
    TriquetraError::ConfigReadFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
