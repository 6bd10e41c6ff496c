//! Endpoint and transfer errors

use super::TriquetraError;

/// Creates an HTTP request error
pub fn http(url: impl ToString, reason: impl ToString) -> TriquetraError {
    TriquetraError::Http {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a listing parse error
pub fn listing_parse(url: impl ToString, reason: impl Into<String>) -> TriquetraError {
    TriquetraError::ListingParse {
        url: url.to_string(),
        reason: reason.into(),
    }
}
