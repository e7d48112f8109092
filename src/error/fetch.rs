//! HTTP fetch errors

use super::StackupError;

/// Creates a fetch failed error
pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> StackupError {
    StackupError::FetchFailed {
        url: url.into(),
        reason: reason.into(),
    }
}
