//! Package-index resolution
//!
//! Finds the newest package of a family (e.g. `postgresql-<major>`) among the
//! names the package index knows about.

use regex::Regex;

use super::version::{VersionOrdering, pick_newest};
use super::{CandidateOrigin, ResolvedCandidate};
use crate::error::{Result, resolve};
use crate::remediation::matcher::PackageMatcher;
use crate::system::apt::PackageManager;

/// A package family in the index
#[derive(Debug, Clone)]
pub struct PackageFamily<'a> {
    pub component: &'a str,
    pub prefix: &'a str,
    pub pattern: &'a str,
    pub exclude: &'a [String],
    pub ordering: VersionOrdering,
}

/// Resolve the newest package of a family
///
/// Names must fully match the family pattern; the first capture group, when
/// present, is the version. Excluded names never count.
pub fn resolve(packages: &dyn PackageManager, family: &PackageFamily<'_>) -> Result<ResolvedCandidate> {
    let names = packages.search_names(family.prefix)?;
    tracing::debug!(
        component = family.component,
        count = names.len(),
        "package index candidates"
    );
    select(family, names)
}

/// Select the newest candidate from a raw name list
pub fn select(family: &PackageFamily<'_>, names: Vec<String>) -> Result<ResolvedCandidate> {
    let pattern = Regex::new(family.pattern)
        .map_err(|e| resolve::invalid_pattern(family.pattern, e))?;
    let excluded = PackageMatcher::from_entries(family.exclude)?;

    let matching: Vec<(String, String)> = names
        .iter()
        .filter(|name| !excluded.matches(name))
        .filter_map(|name| full_match_version(&pattern, name).map(|v| (name.clone(), v)))
        .collect();

    let (identifier, version) = pick_newest(&matching, |(_, v)| v.as_str(), family.ordering)
        .cloned()
        .ok_or_else(|| resolve::not_found(family.component, family.pattern))?;

    tracing::info!(
        component = family.component,
        candidate = %identifier,
        version = %version,
        "resolved from package index"
    );

    Ok(ResolvedCandidate {
        identifier,
        version: Some(version),
        origin: CandidateOrigin::PackageIndex,
        evidence: names,
    })
}

/// The version captured by `pattern` when it matches the whole name
fn full_match_version(pattern: &Regex, name: &str) -> Option<String> {
    let captures = pattern.captures(name)?;
    let whole = captures.get(0)?;
    if whole.start() != 0 || whole.end() != name.len() {
        return None;
    }
    let version = captures.get(1).unwrap_or(whole);
    Some(version.as_str().to_string())
}
