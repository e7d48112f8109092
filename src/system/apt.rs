//! apt/dpkg package manager

use std::rc::Rc;

use super::{Cmd, CommandRunner};
use crate::error::Result;

/// Install state of a package as reported by dpkg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// Fully installed (`ii`)
    Installed,
    /// Removed but configuration files remain (`rc`)
    ConfigFiles,
    /// Half-installed, unpacked, triggers pending, ...
    Other,
}

/// A package known to dpkg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub state: PackageState,
}

/// Package index and package state operations
pub trait PackageManager {
    /// Names in the package index starting with `prefix`
    fn search_names(&self, prefix: &str) -> Result<Vec<String>>;

    /// Refresh the package index
    fn update(&self) -> Result<()>;

    fn install(&self, packages: &[String]) -> Result<()>;

    /// Remove packages together with their configuration
    fn purge(&self, packages: &[String]) -> Result<()>;

    /// Remove dependencies nothing needs any more
    fn autoremove(&self) -> Result<()>;

    /// Drop downloaded package files
    fn clean(&self) -> Result<()>;

    /// Every package dpkg knows about, with its state
    fn installed(&self) -> Result<Vec<InstalledPackage>>;

    /// Point an alternatives link at `path`
    fn set_alternative(&self, name: &str, path: &str) -> Result<()>;
}

/// `apt-get`, `apt-cache`, `dpkg-query` and `update-alternatives`
pub struct Apt {
    runner: Rc<dyn CommandRunner>,
}

impl Apt {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn apt_get(&self) -> Cmd {
        Cmd::new("apt-get")
            .env("DEBIAN_FRONTEND", "noninteractive")
            .mutating()
    }
}

impl PackageManager for Apt {
    fn search_names(&self, prefix: &str) -> Result<Vec<String>> {
        let output = self
            .runner
            .run(&Cmd::new("apt-cache").args(["pkgnames", prefix]))?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn update(&self) -> Result<()> {
        self.runner.run(&self.apt_get().arg("update"))?;
        Ok(())
    }

    fn install(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        self.runner.run(
            &self
                .apt_get()
                .args(["install", "-y", "--no-install-recommends"])
                .args(packages.iter().cloned()),
        )?;
        Ok(())
    }

    fn purge(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        self.runner.run(
            &self
                .apt_get()
                .args(["purge", "-y"])
                .args(packages.iter().cloned()),
        )?;
        Ok(())
    }

    fn autoremove(&self) -> Result<()> {
        self.runner
            .run(&self.apt_get().args(["autoremove", "--purge", "-y"]))?;
        Ok(())
    }

    fn clean(&self) -> Result<()> {
        self.runner.run(&self.apt_get().arg("clean"))?;
        Ok(())
    }

    fn installed(&self) -> Result<Vec<InstalledPackage>> {
        let output = self.runner.run(
            &Cmd::new("dpkg-query").args(["-W", "-f", "${Package}\t${db:Status-Abbrev}\n"]),
        )?;
        Ok(parse_dpkg_status(&output.stdout))
    }

    fn set_alternative(&self, name: &str, path: &str) -> Result<()> {
        self.runner.run(
            &Cmd::new("update-alternatives")
                .args(["--set", name, path])
                .mutating(),
        )?;
        Ok(())
    }
}

/// Parse `dpkg-query -W -f '${Package}\t${db:Status-Abbrev}\n'` output
///
/// The second status letter is the current state: `i` installed,
/// `c` config-files, anything else is in between.
pub fn parse_dpkg_status(output: &str) -> Vec<InstalledPackage> {
    output
        .lines()
        .filter_map(|line| {
            let (name, status) = line.split_once('\t')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let state = match status.chars().nth(1) {
                Some('i') => PackageState::Installed,
                Some('c') => PackageState::ConfigFiles,
                Some('n') => return None,
                _ => PackageState::Other,
            };
            Some(InstalledPackage {
                name: name.to_string(),
                state,
            })
        })
        .collect()
}
