//! Environment detection errors

use super::TriquetraError;

/// Creates an environment read error
pub fn read_failed(reason: impl Into<String>) -> TriquetraError {
    TriquetraError::EnvironmentRead {
        reason: reason.into(),
    }
}

/// Creates an unsupported environment error
pub fn unsupported(reason: impl Into<String>) -> TriquetraError {
    TriquetraError::UnsupportedEnvironment {
        reason: reason.into(),
    }
}
