//! Vendor repository registration

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::http::Fetcher;
use super::{Cmd, CommandRunner};
use crate::config::{RepositorySpec, TemplateVars};
use crate::error::{Result, StackupError};

const KEYRING_DIR: &str = "/etc/apt/keyrings";
const SOURCES_DIR: &str = "/etc/apt/sources.list.d";

/// A repository with every template rendered for this host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repository {
    Ppa(String),
    Apt {
        name: String,
        key_url: String,
        url: String,
        suite: String,
        components: Vec<String>,
        arch: String,
    },
}

impl Repository {
    /// Render a configured repository for this host
    pub fn render(spec: &RepositorySpec, vars: &TemplateVars) -> Result<Self> {
        Ok(match spec {
            RepositorySpec::Ppa { ppa } => Repository::Ppa(vars.render(ppa)?),
            RepositorySpec::Apt {
                name,
                key_url,
                url,
                suite,
                components,
            } => Repository::Apt {
                name: vars.render(name)?,
                key_url: vars.render(key_url)?,
                url: vars.render(url)?,
                suite: vars.render(suite)?,
                components: vars.render_all(components)?,
                arch: vars.get("arch").unwrap_or("amd64").to_string(),
            },
        })
    }
}

/// Writes trusted keys and source-list entries
pub trait RepositoryRegistrar {
    fn register(&self, repository: &Repository) -> Result<()>;
}

/// Registers repositories under `/etc/apt`
pub struct AptRepositories {
    runner: Rc<dyn CommandRunner>,
    fetcher: Rc<dyn Fetcher>,
    keyring_dir: PathBuf,
    sources_dir: PathBuf,
    dry_run: bool,
}

impl AptRepositories {
    pub fn new(runner: Rc<dyn CommandRunner>, fetcher: Rc<dyn Fetcher>, dry_run: bool) -> Self {
        Self::with_dirs(runner, fetcher, KEYRING_DIR, SOURCES_DIR, dry_run)
    }

    pub fn with_dirs(
        runner: Rc<dyn CommandRunner>,
        fetcher: Rc<dyn Fetcher>,
        keyring_dir: impl Into<PathBuf>,
        sources_dir: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            fetcher,
            keyring_dir: keyring_dir.into(),
            sources_dir: sources_dir.into(),
            dry_run,
        }
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content).map_err(|e| StackupError::IoError {
            message: format!("Failed to write {}: {e}", path.display()),
        })
    }
}

impl RepositoryRegistrar for AptRepositories {
    fn register(&self, repository: &Repository) -> Result<()> {
        match repository {
            Repository::Ppa(ppa) => {
                self.runner.run(
                    &Cmd::new("add-apt-repository")
                        .args(["-y", "--no-update", ppa.as_str()])
                        .mutating(),
                )?;
            }
            Repository::Apt {
                name,
                key_url,
                url,
                suite,
                components,
                arch,
            } => {
                if self.dry_run {
                    println!("[DRY RUN] register apt source {name}: {url} {suite}");
                    return Ok(());
                }

                let key = self.fetcher.get_bytes(key_url)?;
                let extension = if key.starts_with(b"-----BEGIN PGP") {
                    "asc"
                } else {
                    "gpg"
                };
                let keyring = self.keyring_dir.join(format!("{name}.{extension}"));
                self.write(&keyring, &key)?;

                let line = source_line(arch, &keyring, url, suite, components);
                let list = self.sources_dir.join(format!("{name}.list"));
                self.write(&list, format!("{line}\n").as_bytes())?;
                tracing::info!(list = %list.display(), "registered apt source");
            }
        }
        Ok(())
    }
}

/// One-line `deb` entry signed by a dedicated keyring
pub fn source_line(
    arch: &str,
    keyring: &Path,
    url: &str,
    suite: &str,
    components: &[String],
) -> String {
    format!(
        "deb [arch={arch} signed-by={}] {url} {suite} {}",
        keyring.display(),
        components.join(" ")
    )
}
