//! Service-start guard errors

use std::path::Path;

use super::StackupError;

/// Creates an error for a nested acquisition of the guard
pub fn already_held(path: impl AsRef<Path>) -> StackupError {
    StackupError::GuardAlreadyHeld {
        path: path.as_ref().display().to_string(),
    }
}

/// Creates an error for a failed guard file operation
pub fn failed(path: impl AsRef<Path>, reason: impl ToString) -> StackupError {
    StackupError::GuardFailed {
        path: path.as_ref().display().to_string(),
        reason: reason.to_string(),
    }
}
