//! Version resolution errors

use super::StackupError;

/// Creates an error for an empty candidate set
pub fn not_found(component: impl Into<String>, pattern: impl Into<String>) -> StackupError {
    StackupError::CandidateNotFound {
        component: component.into(),
        pattern: pattern.into(),
    }
}

/// Creates an error for an exhausted fallback chain
pub fn all_sources_failed(component: impl Into<String>, attempts: &[String]) -> StackupError {
    StackupError::AllSourcesFailed {
        component: component.into(),
        attempts: attempts.join("; "),
    }
}

/// Creates an invalid pattern error
pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> StackupError {
    StackupError::InvalidPattern {
        pattern: pattern.into(),
        reason: reason.to_string(),
    }
}
