//! Cache errors

use super::TriquetraError;

/// Creates a cache operation failed error
pub fn operation_failed(message: impl Into<String>) -> TriquetraError {
    TriquetraError::CacheOperationFailed {
        message: message.into(),
    }
}
