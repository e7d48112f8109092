//! Service-start guard
//!
//! While packages are being installed, Debian maintainer scripts consult
//! `/usr/sbin/policy-rc.d` before starting a daemon; exit code 101 means
//! "action forbidden". The guard installs such a blocking policy for the
//! duration of an install and restores whatever was there before.
//!
//! ## Usage
//!
//! ```ignore
//! let guard = ServiceStartGuard::new("/usr/sbin/policy-rc.d");
//!
//! guard.scoped(|| packages.install(&names))?;
//!
//! // or, holding the window explicitly:
//! let window = guard.window()?;
//! packages.install(&names)?;
//! window.release()?;
//! // a window dropped without release (error, panic) restores on drop
//! ```

use std::cell::Cell;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, guard};

/// Policy that refuses every service start
pub const BLOCKING_POLICY: &str = "#!/bin/sh\n# Installed by stackup while packages are being installed\nexit 101\n";

const BACKUP_SUFFIX: &str = ".stackup-backup";

/// Prior state of the policy file, needed to release the guard
///
/// Not `Clone`: a token is handed back exactly once.
#[derive(Debug, PartialEq, Eq)]
pub enum GuardToken {
    /// No policy existed before acquisition
    Absent,
    /// A policy existed and was copied to `backup`
    Present { backup: PathBuf },
}

/// Scoped owner of the host's service-start policy
#[derive(Debug)]
pub struct ServiceStartGuard {
    policy_path: PathBuf,
    held: Cell<bool>,
}

impl ServiceStartGuard {
    pub fn new(policy_path: impl Into<PathBuf>) -> Self {
        Self {
            policy_path: policy_path.into(),
            held: Cell::new(false),
        }
    }

    pub fn policy_path(&self) -> &Path {
        &self.policy_path
    }

    /// Where an existing policy is saved while the guard is held
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .policy_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(BACKUP_SUFFIX);
        self.policy_path.with_file_name(name)
    }

    #[cfg(test)]
    pub fn is_held(&self) -> bool {
        self.held.get()
    }

    /// Block service starts, remembering the previous policy
    ///
    /// Fails with `GuardAlreadyHeld` when called again before release.
    pub fn acquire(&self) -> Result<GuardToken> {
        if self.held.get() {
            return Err(guard::already_held(&self.policy_path));
        }

        self.recover_stale()?;

        let token = if fs::symlink_metadata(&self.policy_path).is_ok() {
            let backup = self.backup_path();
            fs::copy(&self.policy_path, &backup)
                .map_err(|e| guard::failed(&self.policy_path, format!("backup failed: {e}")))?;
            GuardToken::Present { backup }
        } else {
            GuardToken::Absent
        };

        if let Err(e) = self.install_blocking_policy() {
            if let Err(restore) = self.restore(&token) {
                tracing::warn!(error = %restore, "failed to undo partial guard acquisition");
            }
            return Err(e);
        }

        tracing::debug!(path = %self.policy_path.display(), token = ?token, "service starts blocked");
        self.held.set(true);
        Ok(token)
    }

    /// Restore the state recorded in `token`
    ///
    /// Releasing a state that is already restored is a no-op.
    pub fn release(&self, token: GuardToken) -> Result<()> {
        let result = self.restore(&token);
        self.held.set(false);
        if result.is_ok() {
            tracing::debug!(path = %self.policy_path.display(), "service starts unblocked");
        }
        result
    }

    /// Acquire and hand back a window that releases when dropped
    pub fn window(&self) -> Result<GuardWindow<'_>> {
        let token = self.acquire()?;
        Ok(GuardWindow {
            guard: self,
            token: Some(token),
        })
    }

    /// Run `f` with service starts blocked, releasing on every exit path
    pub fn scoped<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let window = self.window()?;
        let result = f();
        let released = window.release();
        let value = result?;
        released?;
        Ok(value)
    }

    fn restore(&self, token: &GuardToken) -> Result<()> {
        match token {
            GuardToken::Present { backup } => {
                if backup.exists() {
                    fs::rename(backup, &self.policy_path)
                        .map_err(|e| guard::failed(&self.policy_path, format!("restore failed: {e}")))?;
                }
            }
            GuardToken::Absent => {
                if self.is_blocking_policy() {
                    remove_if_exists(&self.policy_path)?;
                }
                remove_if_exists(&self.backup_path())?;
            }
        }
        Ok(())
    }

    /// Undo a blocking policy left behind by an interrupted run
    fn recover_stale(&self) -> Result<()> {
        if !self.is_blocking_policy() {
            return Ok(());
        }

        let backup = self.backup_path();
        tracing::warn!(
            path = %self.policy_path.display(),
            "found a blocking policy from an interrupted run, restoring"
        );
        if backup.exists() {
            fs::rename(&backup, &self.policy_path)
                .map_err(|e| guard::failed(&self.policy_path, format!("restore failed: {e}")))?;
        } else {
            remove_if_exists(&self.policy_path)?;
        }
        Ok(())
    }

    fn is_blocking_policy(&self) -> bool {
        fs::read_to_string(&self.policy_path).is_ok_and(|content| content == BLOCKING_POLICY)
    }

    fn install_blocking_policy(&self) -> Result<()> {
        let parent = self
            .policy_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut file = NamedTempFile::new_in(parent)
            .map_err(|e| guard::failed(&self.policy_path, e))?;
        file.write_all(BLOCKING_POLICY.as_bytes())
            .map_err(|e| guard::failed(&self.policy_path, e))?;
        make_executable(file.path()).map_err(|e| guard::failed(&self.policy_path, e))?;
        file.persist(&self.policy_path)
            .map_err(|e| guard::failed(&self.policy_path, e.error))?;
        Ok(())
    }
}

/// An acquired guard; releases on drop unless released explicitly
#[derive(Debug)]
pub struct GuardWindow<'g> {
    guard: &'g ServiceStartGuard,
    token: Option<GuardToken>,
}

impl GuardWindow<'_> {
    pub fn release(mut self) -> Result<()> {
        match self.token.take() {
            Some(token) => self.guard.release(token),
            None => Ok(()),
        }
    }
}

impl Drop for GuardWindow<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(e) = self.guard.release(token) {
                tracing::warn!(error = %e, "failed to release service-start guard");
                eprintln!(
                    "Warning: {e}. Remove {} manually to re-enable service auto-start.",
                    self.guard.policy_path().display()
                );
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(guard::failed(path, e)),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
