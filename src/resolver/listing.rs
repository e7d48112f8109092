//! Listing-page resolution
//!
//! Source releases are published as an HTML index with one directory per
//! release series. The newest series is chosen first, then the newest archive
//! inside it, preferring stable builds over pre-releases.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::version::{VersionOrdering, pick_newest};
use super::{CandidateOrigin, ResolvedCandidate};
use crate::config::{CandidateSource, ComponentSpec};
use crate::error::{Result, config, resolve};
use crate::system::http::{Fetcher, join_url};

#[allow(clippy::expect_used)]
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("href regex is valid")
});

/// The listing-page source of one component
#[derive(Debug, Clone)]
pub struct Listing<'a> {
    pub component: &'a str,
    pub index_url: &'a str,
    /// Matches series directory links; the first capture group is the version
    pub series_pattern: &'a str,
    pub archive_pattern: &'a str,
    pub prerelease_marker: &'a str,
    pub ordering: VersionOrdering,
}

impl<'a> Listing<'a> {
    pub fn of(spec: &'a ComponentSpec) -> Result<Self> {
        match &spec.source {
            CandidateSource::Listing {
                index_url,
                series_pattern,
                archive_pattern,
                prerelease_marker,
            } => Ok(Self {
                component: &spec.name,
                index_url,
                series_pattern,
                archive_pattern,
                prerelease_marker,
                ordering: spec.ordering,
            }),
            _ => Err(config::invalid(format!(
                "component '{}' is not resolved from a listing page",
                spec.id
            ))),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| resolve::invalid_pattern(pattern, e))
}

/// Every `href` target of an HTML page, in document order
pub fn links(html: &str) -> Vec<String> {
    HREF.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Resolve the newest archive URL
pub fn resolve(fetcher: &dyn Fetcher, listing: &Listing<'_>) -> Result<ResolvedCandidate> {
    let series_pattern = compile(listing.series_pattern)?;
    let archive_pattern = compile(listing.archive_pattern)?;
    let prerelease = compile(listing.prerelease_marker)?;

    let index = fetcher.get_text(listing.index_url)?;
    let series: Vec<(String, String)> = links(&index)
        .into_iter()
        .filter_map(|link| {
            let version = series_pattern.captures(&link)?.get(1)?.as_str().to_string();
            Some((link, version))
        })
        .collect();

    let (series_link, series_version) =
        pick_newest(&series, |(_, v)| v.as_str(), listing.ordering)
            .ok_or_else(|| resolve::not_found(listing.component, listing.series_pattern))?;
    let series_url = join_url(listing.index_url, series_link)?;
    tracing::debug!(component = listing.component, series = %series_version, "newest series");

    let page = fetcher.get_text(&series_url)?;
    let archives = archive_names(&page, &archive_pattern);

    let (pre, stable): (Vec<&String>, Vec<&String>) =
        archives.iter().partition(|name| prerelease.is_match(name));

    let chosen = pick_newest(&stable, |name| name.as_str(), listing.ordering)
        .or_else(|| {
            tracing::info!(
                component = listing.component,
                series = %series_version,
                "no stable archive, using the newest pre-release"
            );
            pick_newest(&pre, |name| name.as_str(), listing.ordering)
        })
        .ok_or_else(|| resolve::not_found(listing.component, listing.archive_pattern))?;

    let identifier = join_url(&series_url, chosen)?;
    tracing::info!(component = listing.component, url = %identifier, "resolved from listing");

    Ok(ResolvedCandidate {
        identifier,
        version: Some(series_version.clone()),
        origin: CandidateOrigin::Listing,
        evidence: archives,
    })
}

/// Archive file names linked from a series page, deduplicated in page order
///
/// Only the last path segment of a link counts and it must match the whole
/// archive pattern, so signatures and checksums are skipped.
fn archive_names(html: &str, pattern: &Regex) -> Vec<String> {
    let mut seen = HashSet::new();
    links(html)
        .into_iter()
        .filter_map(|link| link.rsplit('/').next().map(str::to_string))
        .filter(|name| {
            pattern
                .find(name)
                .is_some_and(|m| m.start() == 0 && m.end() == name.len())
        })
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
