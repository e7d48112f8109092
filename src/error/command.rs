//! External command errors

use super::StackupError;

/// Creates an error for a program that could not be started
pub fn spawn_failed(program: impl Into<String>, reason: impl Into<String>) -> StackupError {
    StackupError::CommandSpawnFailed {
        program: program.into(),
        reason: reason.into(),
    }
}

/// Creates an error for a command that exited unsuccessfully
pub fn failed(
    command: impl Into<String>,
    status: impl Into<String>,
    stderr: impl Into<String>,
) -> StackupError {
    StackupError::CommandFailed {
        command: command.into(),
        status: status.into(),
        stderr: stderr.into(),
    }
}
