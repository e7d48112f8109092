//! Step execution
//!
//! A step is one logical action of a run. Whatever the action does, errors
//! and panics stop at this boundary and become a failed [`StepOutcome`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{Result, StackupError};
use crate::ledger::StepOutcome;

/// Run `action` and turn its result into an outcome
pub fn execute(label: &str, action: impl FnOnce() -> Result<()>) -> StepOutcome {
    match catch(label, action) {
        Ok(()) => StepOutcome::succeeded(label),
        Err(e) => {
            tracing::debug!(label, error = %e, "step failed");
            StepOutcome::failed(label, e.to_string())
        }
    }
}

/// Run `action`, converting a panic into `StepPanicked`
pub fn catch<T>(label: &str, action: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(action)).unwrap_or_else(|payload| {
        Err(StackupError::StepPanicked {
            label: label.to_string(),
            message: panic_message(payload.as_ref()),
        })
    })
}

/// Try `primary`; when it fails hand its error to `fallback`
///
/// The fallback's error is the one reported when both fail.
pub fn with_fallback<T>(
    label: &str,
    primary: impl FnOnce() -> Result<T>,
    fallback: impl FnOnce(StackupError) -> Result<T>,
) -> Result<T> {
    match primary() {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(label, error = %e, "primary attempt failed, trying fallback");
            fallback(e)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn io_error(message: &str) -> StackupError {
        StackupError::IoError {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_success() {
        let outcome = execute("Base tooling", || Ok(()));
        assert_eq!(outcome, StepOutcome::succeeded("Base tooling"));
    }

    #[test]
    fn test_error_becomes_failed_outcome() {
        let outcome = execute("Docker engine", || Err(io_error("apt-get exploded")));
        assert!(!outcome.success);
        assert!(outcome.detail.unwrap().contains("apt-get exploded"));
    }

    #[test]
    fn test_panic_becomes_failed_outcome() {
        let outcome = execute("Neovim editor", || -> Result<()> {
            panic!("index out of bounds")
        });
        assert!(!outcome.success);
        let detail = outcome.detail.unwrap();
        assert!(detail.contains("panicked"), "got: {detail}");
        assert!(detail.contains("index out of bounds"), "got: {detail}");
    }

    #[test]
    fn test_formatted_panic_message() {
        let err = catch("step", || -> Result<()> { panic!("code {}", 7) }).unwrap_err();
        assert!(err.to_string().contains("code 7"));
    }

    #[test]
    fn test_fallback_not_called_on_success() {
        let called = Cell::new(false);
        let value = with_fallback(
            "PHP stack",
            || Ok(1),
            |_| {
                called.set(true);
                Ok(2)
            },
        )
        .unwrap();
        assert_eq!(value, 1);
        assert!(!called.get());
    }

    #[test]
    fn test_fallback_receives_primary_error() {
        let value = with_fallback(
            "PHP stack",
            || Err(io_error("8.4 broken")),
            |e| {
                assert!(e.to_string().contains("8.4 broken"));
                Ok("8.3")
            },
        )
        .unwrap();
        assert_eq!(value, "8.3");
    }

    #[test]
    fn test_both_failing_reports_fallback_error() {
        let err = with_fallback::<()>(
            "PHP stack",
            || Err(io_error("primary")),
            |_| Err(io_error("fallback")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("fallback"));
    }
}
