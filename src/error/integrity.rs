//! Checksum errors

use std::path::Path;

use super::TriquetraError;

/// Creates a checksum compute error
pub fn compute_failed(path: &Path, reason: impl ToString) -> TriquetraError {
    TriquetraError::ChecksumCompute {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates an invalid checksum error
pub fn invalid_checksum(value: impl Into<String>, reason: impl Into<String>) -> TriquetraError {
    TriquetraError::InvalidChecksum {
        value: value.into(),
        reason: reason.into(),
    }
}
