//! Configuration file handling for stackup
//!
//! The stack is described by a YAML file (`stackup.yaml`): the base tooling,
//! the conflict families, and the ordered list of components. When no file
//! is found the built-in catalog is used.

pub mod component;
pub mod template;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use component::{CandidateSource, ComponentSpec, LinkSpec, RepositorySpec};
pub use template::TemplateVars;

use crate::error::{Result, StackupError, config};
use crate::remediation::matcher::PackageMatcher;

/// File name looked up in the current directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "stackup.yaml";

const BUILTIN_CATALOG: &str = include_str!("default_stack.yaml");

fn default_true() -> bool {
    true
}

fn default_os_release_path() -> PathBuf {
    PathBuf::from("/etc/os-release")
}

fn default_policy_path() -> PathBuf {
    PathBuf::from("/usr/sbin/policy-rc.d")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("stackup/{}", env!("CARGO_PKG_VERSION"))
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Builtin,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::Builtin => write!(f, "built-in catalog"),
        }
    }
}

/// Top-level stack configuration (stackup.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Packages installed before anything else; failure aborts the run
    #[serde(default)]
    pub base_packages: Vec<String>,

    #[serde(default = "default_os_release_path")]
    pub os_release_path: PathBuf,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Directory for downloaded archives (system temp dir when unset)
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Run autoremove and clean at the end
    #[serde(default = "default_true")]
    pub cleanup: bool,

    #[serde(default)]
    pub conflicts: Vec<ConflictFamily>,

    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

/// Service-start guard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    #[serde(default = "default_policy_path")]
    pub policy_path: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            policy_path: default_policy_path(),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Software known to conflict with a component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConflictFamily {
    pub name: String,

    /// Exact package names
    #[serde(default)]
    pub packages: Vec<String>,

    /// Glob patterns over package names
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Units stopped and disabled before removal
    #[serde(default)]
    pub services: Vec<String>,

    /// Configuration and state directories deleted after removal
    #[serde(default)]
    pub residual_dirs: Vec<PathBuf>,
}

impl ConflictFamily {
    /// Build the matcher for this family's package names
    pub fn matcher(&self) -> Result<PackageMatcher> {
        PackageMatcher::new(&self.packages, &self.patterns)
    }
}

impl StackConfig {
    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(yaml: &str, origin: &ConfigOrigin) -> Result<Self> {
        let parsed: Self = serde_yaml::from_str(yaml)
            .map_err(|e| config::parse_failed(origin.to_string(), e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// The built-in catalog
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG, &ConfigOrigin::Builtin)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(config::not_found(path.display().to_string()));
        }
        let yaml = fs::read_to_string(path)
            .map_err(|e| config::read_failed(path.display().to_string(), e.to_string()))?;
        Self::from_yaml(&yaml, &ConfigOrigin::File(path.to_path_buf()))
    }

    /// Load the configuration using the lookup order:
    /// explicit path, `./stackup.yaml`, `<config dir>/stackup/stackup.yaml`, built-in.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, ConfigOrigin::File(path.to_path_buf())));
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "using configuration file");
                let loaded = Self::from_file(&candidate)?;
                return Ok((loaded, ConfigOrigin::File(candidate)));
            }
        }

        Ok((Self::builtin()?, ConfigOrigin::Builtin))
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("stackup").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Find a component by id
    pub fn component(&self, id: &str) -> Result<&ComponentSpec> {
        self.components
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StackupError::UnknownComponent { id: id.to_string() })
    }

    /// Find a conflict family by name
    pub fn conflict_family(&self, name: &str) -> Result<&ConflictFamily> {
        self.conflicts
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| config::invalid(format!("unknown conflict family '{name}'")))
    }

    /// Check cross-references, patterns and templates
    pub fn validate(&self) -> Result<()> {
        let mut family_names = HashSet::new();
        for family in &self.conflicts {
            if !family_names.insert(family.name.as_str()) {
                return Err(config::invalid(format!(
                    "duplicate conflict family '{}'",
                    family.name
                )));
            }
            family.matcher()?;
        }

        let mut ids = HashSet::new();
        for component in &self.components {
            if !ids.insert(component.id.as_str()) {
                return Err(config::invalid(format!(
                    "duplicate component id '{}'",
                    component.id
                )));
            }
            validate_component(component, &family_names)?;
        }

        Ok(())
    }
}

fn validate_component(component: &ComponentSpec, families: &HashSet<&str>) -> Result<()> {
    let id = &component.id;

    if let Some(family) = &component.conflicts_with {
        if !families.contains(family.as_str()) {
            return Err(config::invalid(format!(
                "component '{id}' conflicts with unknown family '{family}'"
            )));
        }
    }

    match &component.source {
        CandidateSource::Fixed => {
            if component.packages.is_empty() {
                return Err(config::invalid(format!(
                    "component '{id}' has a fixed source but no packages"
                )));
            }
        }
        CandidateSource::PackageIndex {
            pattern, exclude, ..
        } => {
            compile(pattern)?;
            PackageMatcher::from_entries(exclude)?;
            if component.packages.is_empty() {
                return Err(config::invalid(format!(
                    "component '{id}' resolves from the package index but lists no packages"
                )));
            }
        }
        CandidateSource::ReleaseFeed { asset_pattern, .. } => {
            compile(asset_pattern)?;
        }
        CandidateSource::Listing {
            series_pattern,
            archive_pattern,
            prerelease_marker,
            ..
        } => {
            compile(series_pattern)?;
            compile(archive_pattern)?;
            compile(prerelease_marker)?;
        }
    }

    if component.is_archive() && component.install_dir.is_none() {
        return Err(config::invalid(format!(
            "archive component '{id}' needs an install_dir"
        )));
    }

    if component.fallback.is_some()
        && !matches!(component.source, CandidateSource::PackageIndex { .. })
    {
        return Err(config::invalid(format!(
            "component '{id}' declares a fallback version but is not resolved from the package index"
        )));
    }

    for template in component.templates() {
        for placeholder in template::placeholders(template) {
            if !template::PLACEHOLDERS.contains(&placeholder) {
                return Err(config::invalid(format!(
                    "component '{id}' uses unknown placeholder {{{placeholder}}} in '{template}'"
                )));
            }
        }
    }

    Ok(())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| crate::error::resolve::invalid_pattern(pattern, e))
}
