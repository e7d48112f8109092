//! Component specifications
//!
//! A component is one provisionable unit of the stack (a web server, a
//! language runtime, a database, ...). Components are immutable for the
//! duration of a run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolver::version::VersionOrdering;

fn default_true() -> bool {
    true
}

fn default_series_pattern() -> String {
    r"^(\d+\.\d+)/$".to_string()
}

fn default_prerelease_marker() -> String {
    r"(?i)(alpha|beta|rc)\d*".to_string()
}

fn default_suite() -> String {
    "{codename}".to_string()
}

fn default_components() -> Vec<String> {
    vec!["main".to_string()]
}

/// Static description of one provisionable software unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    /// Short identifier used on the command line (e.g. `php`)
    pub id: String,

    /// Human label, used as the ledger label
    pub name: String,

    /// Answer used when the user accepts defaults
    #[serde(default = "default_true")]
    pub default_answer: bool,

    /// Where the installable candidate comes from
    pub source: CandidateSource,

    /// How candidate versions are ordered
    #[serde(default)]
    pub ordering: VersionOrdering,

    /// Package names to install, templated with `{version}` and `{name}`
    #[serde(default)]
    pub packages: Vec<String>,

    /// Version to retry with when the resolved version fails to install
    #[serde(default)]
    pub fallback: Option<String>,

    /// Packages purged before the fallback attempt, templated with the failed version
    #[serde(default)]
    pub retry_purge: Vec<String>,

    /// Vendor repository to register before installing
    #[serde(default)]
    pub repository: Option<RepositorySpec>,

    /// Conflict family removed before installing
    #[serde(default)]
    pub conflicts_with: Option<String>,

    /// Install with service auto-start blocked
    #[serde(default)]
    pub guarded: bool,

    /// Units enabled and started once installed
    #[serde(default)]
    pub services: Vec<String>,

    /// Alternative switched to the installed version
    #[serde(default)]
    pub alternative: Option<AlternativeSpec>,

    /// Extraction directory for archive components
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Symlink created after extracting an archive component
    #[serde(default)]
    pub link: Option<LinkSpec>,

    /// Command printed after install to show the installed version
    #[serde(default)]
    pub version_command: Vec<String>,
}

impl ComponentSpec {
    /// Whether this component is installed from a downloaded archive
    pub fn is_archive(&self) -> bool {
        matches!(
            self.source,
            CandidateSource::ReleaseFeed { .. } | CandidateSource::Listing { .. }
        )
    }

    /// All templated strings of this component, for validation
    pub fn templates(&self) -> Vec<&str> {
        let mut templates: Vec<&str> = self
            .packages
            .iter()
            .chain(&self.retry_purge)
            .chain(&self.services)
            .map(String::as_str)
            .collect();
        if let Some(alternative) = &self.alternative {
            templates.push(&alternative.path);
        }
        if let Some(repository) = &self.repository {
            templates.extend(repository.templates());
        }
        templates
    }
}

/// Source of the installable candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateSource {
    /// Package names are listed literally
    Fixed,

    /// Newest package in the index matching a family pattern
    PackageIndex {
        /// Name prefix passed to the package index search
        prefix: String,
        /// Regex a name must fully match; the first capture group is the version
        pattern: String,
        /// Exact names or globs never considered (e.g. `*-dbgsym`)
        #[serde(default)]
        exclude: Vec<String>,
    },

    /// Binary archive published through a release metadata endpoint
    ReleaseFeed {
        metadata_url: String,
        /// Regex the asset name must match
        asset_pattern: String,
        latest_url: String,
        stable_url: String,
    },

    /// Source archive found on a listing page with per-series directories
    Listing {
        index_url: String,
        #[serde(default = "default_series_pattern")]
        series_pattern: String,
        archive_pattern: String,
        #[serde(default = "default_prerelease_marker")]
        prerelease_marker: String,
    },
}

impl CandidateSource {
    /// Short description used by `stackup plan`
    pub fn describe(&self) -> String {
        match self {
            CandidateSource::Fixed => "fixed package list".to_string(),
            CandidateSource::PackageIndex {
                prefix, pattern, ..
            } => format!("newest of '{prefix}*' matching {pattern}"),
            CandidateSource::ReleaseFeed { metadata_url, .. } => {
                format!("release feed {metadata_url}")
            }
            CandidateSource::Listing { index_url, .. } => format!("listing {index_url}"),
        }
    }
}

/// Vendor package repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepositorySpec {
    /// Launchpad personal package archive
    Ppa { ppa: String },

    /// Signed apt source
    Apt {
        /// File stem for the keyring and source list
        name: String,
        key_url: String,
        url: String,
        #[serde(default = "default_suite")]
        suite: String,
        #[serde(default = "default_components")]
        components: Vec<String>,
    },
}

impl RepositorySpec {
    fn templates(&self) -> Vec<&str> {
        match self {
            RepositorySpec::Ppa { ppa } => vec![ppa.as_str()],
            RepositorySpec::Apt {
                name,
                key_url,
                url,
                suite,
                components,
            } => {
                let mut templates = vec![name.as_str(), key_url, url, suite];
                templates.extend(components.iter().map(String::as_str));
                templates
            }
        }
    }

    /// Short description used by `stackup plan`
    pub fn describe(&self) -> String {
        match self {
            RepositorySpec::Ppa { ppa } => ppa.clone(),
            RepositorySpec::Apt { url, suite, .. } => format!("{url} {suite}"),
        }
    }
}

/// An update-alternatives link switched to the installed version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlternativeSpec {
    /// Alternative name (e.g. `php`)
    pub name: String,
    /// Target path, templated (e.g. `/usr/bin/php{version}`)
    pub path: String,
}

/// Symlink into an extracted archive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    /// Path relative to the install directory
    pub target: PathBuf,
    /// Absolute path of the symlink
    pub path: PathBuf,
}
