//! Error types and handling for stackup
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`command`]: External command errors
//! - [`config`]: Configuration errors
//! - [`fetch`]: HTTP fetch errors
//! - [`guard`]: Service-start guard errors
//! - [`resolve`]: Version resolution errors

#![allow(unused_assignments)]

pub mod command;
pub mod config;
pub mod fetch;
pub mod guard;
pub mod resolve;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for stackup operations
#[derive(Error, Diagnostic, Debug)]
pub enum StackupError {
    // Command errors
    #[error("Failed to run '{program}': {reason}")]
    #[diagnostic(
        code(stackup::command::spawn_failed),
        help("Check that the program is installed and on PATH")
    )]
    CommandSpawnFailed { program: String, reason: String },

    #[error("Command '{command}' failed ({status}): {stderr}")]
    #[diagnostic(
        code(stackup::command::failed),
        help("Re-run the command manually to see the full output")
    )]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    // Resolution errors
    #[error("No installable candidate found for '{component}' (pattern: {pattern})")]
    #[diagnostic(
        code(stackup::resolve::not_found),
        help("Check that the vendor repository was added and the package index refreshed")
    )]
    CandidateNotFound { component: String, pattern: String },

    #[error("Every source for '{component}' failed: {attempts}")]
    #[diagnostic(code(stackup::resolve::all_sources_failed))]
    AllSourcesFailed { component: String, attempts: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    #[diagnostic(code(stackup::resolve::invalid_pattern))]
    InvalidPattern { pattern: String, reason: String },

    // Fetch errors
    #[error("Failed to fetch {url}: {reason}")]
    #[diagnostic(
        code(stackup::fetch::failed),
        help("Check network connectivity or raise http.timeout_secs")
    )]
    FetchFailed { url: String, reason: String },

    // Guard errors
    #[error("Service-start guard at {path} is already held")]
    #[diagnostic(code(stackup::guard::already_held))]
    GuardAlreadyHeld { path: String },

    #[error("Service-start guard operation failed at {path}: {reason}")]
    #[diagnostic(
        code(stackup::guard::failed),
        help("Inspect the policy file manually; a leftover override blocks service auto-start")
    )]
    GuardFailed { path: String, reason: String },

    // Remediation errors
    #[error("Conflicting {family} packages are still installed: {packages}")]
    #[diagnostic(
        code(stackup::remediation::conflict_persists),
        help("Remove them manually with 'apt-get purge' and re-run")
    )]
    ConflictPersists { family: String, packages: String },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    #[diagnostic(code(stackup::config::not_found))]
    ConfigNotFound { path: String },

    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(stackup::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(stackup::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(stackup::config::invalid))]
    ConfigInvalid { message: String },

    #[error("Unknown component: {id}")]
    #[diagnostic(
        code(stackup::config::unknown_component),
        help("Run 'stackup plan' to list the configured components")
    )]
    UnknownComponent { id: String },

    // Orchestration errors
    #[error("Could not identify the operating system from {path}: {reason}")]
    #[diagnostic(code(stackup::host::os_identification_failed))]
    OsIdentificationFailed { path: String, reason: String },

    #[error("Mandatory step '{label}' failed: {reason}")]
    #[diagnostic(code(stackup::run::mandatory_step_failed))]
    MandatoryStepFailed { label: String, reason: String },

    #[error("Step '{label}' panicked: {message}")]
    #[diagnostic(code(stackup::run::step_panicked))]
    StepPanicked { label: String, message: String },

    #[error("Repository for '{component}' could not be registered")]
    #[diagnostic(code(stackup::run::repository_unavailable))]
    RepositoryUnavailable { component: String },

    // File system errors
    #[error("IO error: {message}")]
    #[diagnostic(code(stackup::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for StackupError {
    fn from(err: std::io::Error) -> Self {
        StackupError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for StackupError {
    fn from(err: serde_yaml::Error) -> Self {
        StackupError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StackupError {
    fn from(err: serde_json::Error) -> Self {
        StackupError::FetchFailed {
            url: "unknown".to_string(),
            reason: format!("invalid JSON: {err}"),
        }
    }
}

impl From<reqwest::Error> for StackupError {
    fn from(err: reqwest::Error) -> Self {
        StackupError::FetchFailed {
            url: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            reason: err.to_string(),
        }
    }
}

impl From<regex::Error> for StackupError {
    fn from(err: regex::Error) -> Self {
        StackupError::InvalidPattern {
            pattern: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for StackupError {
    fn from(err: inquire::InquireError) -> Self {
        StackupError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, StackupError>;
