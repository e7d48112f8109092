//! Version resolution
//!
//! Turns a [`ComponentSpec`] into one concrete installable identifier: a
//! package name for package-index components, a download URL for release
//! feeds and listing pages.
//!
//! - [`package`]: newest package of a family in the package index
//! - [`release_feed`]: release metadata with "latest" and "stable" fallbacks
//! - [`listing`]: per-series directory listings with stable/pre-release split
//! - [`version`]: the version-aware ordering shared by all three

pub mod listing;
pub mod package;
pub mod release_feed;
pub mod version;

use crate::config::{CandidateSource, ComponentSpec};
use crate::error::Result;
use crate::system::apt::PackageManager;
use crate::system::http::Fetcher;

/// How a candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    /// Literal package list, nothing to resolve
    Fixed,
    PackageIndex,
    /// Asset listed in release metadata
    ReleaseMetadata,
    /// Statically configured "latest" URL
    LatestUrl,
    /// Statically configured "stable" URL
    StableUrl,
    Listing,
    /// Configured fallback version after the resolved one failed
    Fallback,
}

impl std::fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CandidateOrigin::Fixed => "fixed",
            CandidateOrigin::PackageIndex => "package index",
            CandidateOrigin::ReleaseMetadata => "release metadata",
            CandidateOrigin::LatestUrl => "latest URL",
            CandidateOrigin::StableUrl => "stable URL",
            CandidateOrigin::Listing => "listing",
            CandidateOrigin::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Concrete installable identifier chosen for one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCandidate {
    /// Package name or download URL
    pub identifier: String,
    /// Version extracted from the identifier, when there is one
    pub version: Option<String>,
    pub origin: CandidateOrigin,
    /// Raw entries the choice was made from
    pub evidence: Vec<String>,
}

impl ResolvedCandidate {
    /// Candidate that needs no resolution
    pub fn fixed(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: None,
            origin: CandidateOrigin::Fixed,
            evidence: Vec::new(),
        }
    }
}

/// Resolves components against the package index and the network
pub struct VersionResolver<'a> {
    packages: &'a dyn PackageManager,
    fetcher: &'a dyn Fetcher,
}

impl<'a> VersionResolver<'a> {
    pub fn new(packages: &'a dyn PackageManager, fetcher: &'a dyn Fetcher) -> Self {
        Self { packages, fetcher }
    }

    /// Resolve a component to one candidate
    ///
    /// An empty candidate set is `CandidateNotFound`, never a placeholder.
    pub fn resolve(&self, spec: &ComponentSpec) -> Result<ResolvedCandidate> {
        tracing::debug!(component = %spec.id, source = %spec.source.describe(), "resolving");
        match &spec.source {
            CandidateSource::Fixed => Ok(ResolvedCandidate::fixed(&spec.id)),
            CandidateSource::PackageIndex {
                prefix,
                pattern,
                exclude,
            } => package::resolve(
                self.packages,
                &package::PackageFamily {
                    component: &spec.name,
                    prefix,
                    pattern,
                    exclude,
                    ordering: spec.ordering,
                },
            ),
            CandidateSource::ReleaseFeed { .. } => {
                release_feed::resolve(self.fetcher, &release_feed::Feed::of(spec)?)
            }
            CandidateSource::Listing { .. } => {
                listing::resolve(self.fetcher, &listing::Listing::of(spec)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::error::StackupError;
    use crate::test_fixtures::{FakeFetcher, FakePackages};

    #[test]
    fn test_fixed_component_resolves_to_its_id() {
        let config = StackConfig::builtin().unwrap();
        let packages = FakePackages::new();
        let fetcher = FakeFetcher::new();

        let candidate = VersionResolver::new(&packages, &fetcher)
            .resolve(config.component("nginx").unwrap())
            .unwrap();

        assert_eq!(candidate, ResolvedCandidate::fixed("nginx"));
        assert!(packages.calls().is_empty());
    }

    #[test]
    fn test_package_index_component() {
        let config = StackConfig::builtin().unwrap();
        let packages = FakePackages::new();
        packages.add_to_index(&["php8.1-fpm", "php8.3-fpm", "php8.3-fpm-dbgsym", "php8.10-fpm"]);
        let fetcher = FakeFetcher::new();

        let candidate = VersionResolver::new(&packages, &fetcher)
            .resolve(config.component("php").unwrap())
            .unwrap();

        assert_eq!(candidate.identifier, "php8.10-fpm");
        assert_eq!(candidate.version.as_deref(), Some("8.10"));
    }

    #[test]
    fn test_package_index_component_not_found() {
        let config = StackConfig::builtin().unwrap();
        let packages = FakePackages::new();
        let fetcher = FakeFetcher::new();

        let err = VersionResolver::new(&packages, &fetcher)
            .resolve(config.component("postgresql").unwrap())
            .unwrap_err();

        match err {
            StackupError::CandidateNotFound { component, .. } => {
                assert_eq!(component, "PostgreSQL server");
            }
            other => panic!("Expected CandidateNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(CandidateOrigin::StableUrl.to_string(), "stable URL");
        assert_eq!(CandidateOrigin::Fallback.to_string(), "fallback");
    }
}
