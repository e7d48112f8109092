//! Configuration errors

use super::StackupError;

/// Creates a configuration not found error
pub fn not_found(path: impl Into<String>) -> StackupError {
    StackupError::ConfigNotFound { path: path.into() }
}

/// Creates a configuration read error
pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> StackupError {
    StackupError::ConfigReadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a configuration parse error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> StackupError {
    StackupError::ConfigParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid configuration error
pub fn invalid(message: impl Into<String>) -> StackupError {
    StackupError::ConfigInvalid {
        message: message.into(),
    }
}
