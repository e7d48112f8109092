//! Host collaborators
//!
//! Everything that touches the host goes through one of the traits in this
//! module tree so the orchestrator can be exercised against fakes:
//!
//! - [`CommandRunner`]: spawning external programs
//! - [`apt::PackageManager`]: package index and package state
//! - [`systemd::ServiceManager`]: unit enable/start/stop/disable
//! - [`repository::RepositoryRegistrar`]: vendor repositories
//! - [`http::Fetcher`]: release metadata, listings and downloads
//! - [`prompt::Prompter`]: yes/no confirmation

pub mod apt;
pub mod http;
pub mod os_release;
pub mod prompt;
pub mod repository;
pub mod systemd;

use std::process::Command;

use crate::error::{Result, command};

/// A command line to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    mutating: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            mutating: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Mark the command as changing host state; dry runs skip it
    pub fn mutating(mut self) -> Self {
        self.mutating = true;
        self
    }

    #[cfg(test)]
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    /// Shell-like rendering for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs
pub trait CommandRunner {
    /// Run a command to completion; a non-zero exit is an error
    fn run(&self, cmd: &Cmd) -> Result<CommandOutput>;
}

/// Runs commands on the local host
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    dry_run: bool,
}

impl SystemRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandOutput> {
        if self.dry_run && cmd.is_mutating() {
            println!("[DRY RUN] {}", cmd.display());
            return Ok(CommandOutput::default());
        }

        tracing::debug!(command = %cmd.display(), "running");
        let output = Command::new(&cmd.program)
            .args(&cmd.args)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(|e| command::spawn_failed(&cmd.program, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(command::failed(cmd.display(), status, last_lines(&stderr, 5)));
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Keep the tail of a command's stderr for error messages
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join(" | ")
}
