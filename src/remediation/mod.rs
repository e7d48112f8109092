//! Conflict remediation
//!
//! Forcibly removes a software family that conflicts with a component
//! (e.g. Apache before Nginx) and verifies nothing of it stays installed.

pub mod matcher;

use std::fs;
use std::io::ErrorKind;

use crate::config::ConflictFamily;
use crate::error::{Result, StackupError};
use crate::system::apt::{InstalledPackage, PackageManager, PackageState};
use crate::system::systemd::ServiceManager;
use matcher::PackageMatcher;

/// Removes conflicting package families
pub struct ConflictRemediator<'a> {
    packages: &'a dyn PackageManager,
    services: &'a dyn ServiceManager,
    dry_run: bool,
}

impl<'a> ConflictRemediator<'a> {
    pub fn new(
        packages: &'a dyn PackageManager,
        services: &'a dyn ServiceManager,
        dry_run: bool,
    ) -> Self {
        Self {
            packages,
            services,
            dry_run,
        }
    }

    /// Remove every installed package of `family`
    ///
    /// Returns the packages that were purged; nothing installed is a no-op
    /// with an empty list. Fails with `ConflictPersists` when a package of the
    /// family is still installed afterwards.
    pub fn remove_conflicting(&self, family: &ConflictFamily) -> Result<Vec<String>> {
        let matcher = family.matcher()?;
        if matcher.is_empty() {
            return Ok(Vec::new());
        }
        let matched = matching(&self.packages.installed()?, &matcher, PackageState::Installed);

        if matched.is_empty() {
            tracing::debug!(family = %family.name, "no conflicting packages installed");
            return Ok(matched);
        }

        if self.dry_run {
            println!(
                "[DRY RUN] would remove {} packages: {}",
                family.name,
                matched.join(", ")
            );
            return Ok(matched);
        }

        tracing::info!(family = %family.name, packages = ?matched, "removing conflicting packages");

        // The purge below is authoritative; service state is best effort
        for service in &family.services {
            if let Err(e) = self.services.stop(service) {
                tracing::warn!(service = %service, error = %e, "failed to stop service");
            }
            if let Err(e) = self.services.disable(service) {
                tracing::warn!(service = %service, error = %e, "failed to disable service");
            }
        }

        self.packages.purge(&matched)?;

        if let Err(e) = self.packages.autoremove() {
            tracing::warn!(error = %e, "autoremove failed");
        }

        let residue = matching(
            &self.packages.installed()?,
            &matcher,
            PackageState::ConfigFiles,
        );
        if !residue.is_empty() {
            if let Err(e) = self.packages.purge(&residue) {
                tracing::warn!(packages = ?residue, error = %e, "failed to purge configuration residue");
            }
        }

        let remaining = matching(&self.packages.installed()?, &matcher, PackageState::Installed);
        if !remaining.is_empty() {
            return Err(StackupError::ConflictPersists {
                family: family.name.clone(),
                packages: remaining.join(", "),
            });
        }

        for dir in &family.residual_dirs {
            match fs::remove_dir_all(dir) {
                Ok(()) => tracing::debug!(dir = %dir.display(), "removed residual directory"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to remove residual directory")
                }
            }
        }

        Ok(matched)
    }
}

/// Sorted, deduplicated names in `state` matched by `matcher`
fn matching(
    snapshot: &[InstalledPackage],
    matcher: &PackageMatcher,
    state: PackageState,
) -> Vec<String> {
    let mut names: Vec<String> = snapshot
        .iter()
        .filter(|p| p.state == state && matcher.matches(&p.name))
        .map(|p| p.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}
