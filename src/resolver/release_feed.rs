//! Release-feed resolution
//!
//! Binary distributors publish a release metadata document listing the
//! assets of their newest release. When the metadata is unusable the
//! statically configured "latest" URL is used, and when downloading that
//! fails the "stable" URL is the last resort.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use super::{CandidateOrigin, ResolvedCandidate};
use crate::config::{CandidateSource, ComponentSpec};
use crate::error::{Result, config, fetch, resolve};
use crate::system::http::Fetcher;

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

/// The release-feed source of one component
#[derive(Debug, Clone)]
pub struct Feed<'a> {
    pub component: &'a str,
    pub metadata_url: &'a str,
    pub asset_pattern: &'a str,
    pub latest_url: &'a str,
    pub stable_url: &'a str,
}

impl<'a> Feed<'a> {
    pub fn of(spec: &'a ComponentSpec) -> Result<Self> {
        match &spec.source {
            CandidateSource::ReleaseFeed {
                metadata_url,
                asset_pattern,
                latest_url,
                stable_url,
            } => Ok(Self {
                component: &spec.name,
                metadata_url,
                asset_pattern,
                latest_url,
                stable_url,
            }),
            _ => Err(config::invalid(format!(
                "component '{}' is not resolved from a release feed",
                spec.id
            ))),
        }
    }

    fn fixed_url(&self, origin: CandidateOrigin) -> ResolvedCandidate {
        let url = if origin == CandidateOrigin::StableUrl {
            self.stable_url
        } else {
            self.latest_url
        };
        ResolvedCandidate {
            identifier: url.to_string(),
            version: None,
            origin,
            evidence: Vec::new(),
        }
    }
}

/// Pick the download URL without downloading anything
pub fn resolve(fetcher: &dyn Fetcher, feed: &Feed<'_>) -> Result<ResolvedCandidate> {
    // An asset pattern that does not compile is a configuration error, not a fallback case
    let pattern = Regex::new(feed.asset_pattern)
        .map_err(|e| resolve::invalid_pattern(feed.asset_pattern, e))?;

    match from_metadata(fetcher, feed, &pattern) {
        Ok(candidate) => {
            tracing::info!(
                component = feed.component,
                url = %candidate.identifier,
                "resolved from release metadata"
            );
            Ok(candidate)
        }
        Err(e) => {
            tracing::warn!(
                component = feed.component,
                reason = %e,
                "release metadata unusable, falling back to the latest URL"
            );
            Ok(feed.fixed_url(CandidateOrigin::LatestUrl))
        }
    }
}

fn from_metadata(
    fetcher: &dyn Fetcher,
    feed: &Feed<'_>,
    pattern: &Regex,
) -> Result<ResolvedCandidate> {
    let body = fetcher.get_text(feed.metadata_url)?;
    let release: Release = serde_json::from_str(&body)
        .map_err(|e| fetch::failed(feed.metadata_url, format!("invalid release metadata: {e}")))?;

    let evidence: Vec<String> = release.assets.iter().map(|a| a.name.clone()).collect();
    let asset = release
        .assets
        .iter()
        .filter(|a| pattern.is_match(&a.name))
        .last()
        .ok_or_else(|| resolve::not_found(feed.component, feed.asset_pattern))?;

    Ok(ResolvedCandidate {
        identifier: asset.browser_download_url.clone(),
        version: release.tag_name,
        origin: CandidateOrigin::ReleaseMetadata,
        evidence,
    })
}

/// Download `candidate` into `dest`, walking down the fallback chain on failure
///
/// Returns the candidate that was actually downloaded.
pub fn download(
    fetcher: &dyn Fetcher,
    feed: &Feed<'_>,
    candidate: &ResolvedCandidate,
    dest: &Path,
) -> Result<ResolvedCandidate> {
    let mut chain = vec![candidate.clone()];
    if candidate.origin == CandidateOrigin::ReleaseMetadata {
        chain.push(feed.fixed_url(CandidateOrigin::LatestUrl));
    }
    if candidate.origin != CandidateOrigin::StableUrl {
        chain.push(feed.fixed_url(CandidateOrigin::StableUrl));
    }

    let mut attempts = Vec::new();
    let mut chain = chain.into_iter().peekable();
    while let Some(attempt) = chain.next() {
        match fetcher.download(&attempt.identifier, dest) {
            Ok(bytes) => {
                tracing::info!(
                    component = feed.component,
                    url = %attempt.identifier,
                    origin = %attempt.origin,
                    bytes,
                    "downloaded"
                );
                return Ok(attempt);
            }
            Err(e) => {
                if let Some(next) = chain.peek() {
                    tracing::warn!(
                        component = feed.component,
                        url = %attempt.identifier,
                        reason = %e,
                        "download failed, falling back to the {}",
                        next.origin
                    );
                }
                attempts.push(format!("{} ({}): {e}", attempt.origin, attempt.identifier));
            }
        }
    }

    Err(resolve::all_sources_failed(feed.component, &attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackupError;
    use crate::test_fixtures::{FakeFetcher, create_temp_dir};

    fn fetch_with_fallback(
        fetcher: &dyn Fetcher,
        feed: &Feed<'_>,
        dest: &Path,
    ) -> Result<ResolvedCandidate> {
        let candidate = resolve(fetcher, feed)?;
        download(fetcher, feed, &candidate, dest)
    }

    const METADATA: &str = "https://api.example.invalid/releases/latest";
    const ASSET: &str = "https://dl.example.invalid/v0.11.0/nvim-linux-x86_64.tar.gz";
    const LATEST: &str = "https://dl.example.invalid/latest/nvim-linux-x86_64.tar.gz";
    const STABLE: &str = "https://dl.example.invalid/stable/nvim-linux-x86_64.tar.gz";

    fn feed() -> Feed<'static> {
        Feed {
            component: "Neovim editor",
            metadata_url: METADATA,
            asset_pattern: r"^nvim-linux-x86_64\.tar\.gz$",
            latest_url: LATEST,
            stable_url: STABLE,
        }
    }

    fn metadata() -> String {
        format!(
            r#"{{
  "tag_name": "v0.11.0",
  "assets": [
    {{"name": "nvim-linux-arm64.tar.gz", "browser_download_url": "https://dl.example.invalid/v0.11.0/nvim-linux-arm64.tar.gz"}},
    {{"name": "nvim-linux-x86_64.tar.gz", "browser_download_url": "{ASSET}"}},
    {{"name": "nvim-linux-x86_64.tar.gz.sha256sum", "browser_download_url": "https://dl.example.invalid/v0.11.0/sum"}}
  ]
}}"#
        )
    }

    #[test]
    fn test_resolve_from_metadata() {
        let fetcher = FakeFetcher::new();
        fetcher.respond(METADATA, &metadata());

        let candidate = resolve(&fetcher, &feed()).unwrap();
        assert_eq!(candidate.identifier, ASSET);
        assert_eq!(candidate.version.as_deref(), Some("v0.11.0"));
        assert_eq!(candidate.origin, CandidateOrigin::ReleaseMetadata);
        assert_eq!(candidate.evidence.len(), 3);
    }

    #[test]
    fn test_metadata_failure_uses_latest_url() {
        let temp = create_temp_dir();
        let fetcher = FakeFetcher::new();
        fetcher.respond(LATEST, "archive");

        let used = fetch_with_fallback(&fetcher, &feed(), &temp.path().join("a.tgz")).unwrap();
        assert_eq!(used.origin, CandidateOrigin::LatestUrl);
        assert_eq!(fetcher.downloads(), vec![LATEST.to_string()]);
    }

    #[test]
    fn test_metadata_without_matching_asset_uses_latest_url() {
        let fetcher = FakeFetcher::new();
        fetcher.respond(METADATA, r#"{"tag_name": "v0.11.0", "assets": []}"#);

        let candidate = resolve(&fetcher, &feed()).unwrap();
        assert_eq!(candidate.origin, CandidateOrigin::LatestUrl);
        assert_eq!(candidate.identifier, LATEST);
    }

    #[test]
    fn test_malformed_metadata_uses_latest_url() {
        let fetcher = FakeFetcher::new();
        fetcher.respond(METADATA, "<html>rate limited</html>");

        let candidate = resolve(&fetcher, &feed()).unwrap();
        assert_eq!(candidate.origin, CandidateOrigin::LatestUrl);
    }

    #[test]
    fn test_latest_download_failure_uses_stable_url() {
        let temp = create_temp_dir();
        let fetcher = FakeFetcher::new();
        fetcher.respond(LATEST, "archive");
        fetcher.fail_download(LATEST);
        fetcher.respond(STABLE, "archive");

        let dest = temp.path().join("a.tgz");
        let used = fetch_with_fallback(&fetcher, &feed(), &dest).unwrap();
        assert_eq!(used.origin, CandidateOrigin::StableUrl);
        assert_eq!(used.identifier, STABLE);
        assert_eq!(
            fetcher.downloads(),
            vec![LATEST.to_string(), STABLE.to_string()]
        );
        assert!(dest.exists());
    }

    #[test]
    fn test_asset_download_failure_walks_whole_chain() {
        let temp = create_temp_dir();
        let fetcher = FakeFetcher::new();
        fetcher.respond(METADATA, &metadata());
        fetcher.respond(STABLE, "archive");

        let used = fetch_with_fallback(&fetcher, &feed(), &temp.path().join("a.tgz")).unwrap();
        assert_eq!(used.origin, CandidateOrigin::StableUrl);
        assert_eq!(
            fetcher.downloads(),
            vec![ASSET.to_string(), LATEST.to_string(), STABLE.to_string()]
        );
    }

    #[test]
    fn test_every_source_failing_is_an_error() {
        let temp = create_temp_dir();
        let fetcher = FakeFetcher::new();

        let err = fetch_with_fallback(&fetcher, &feed(), &temp.path().join("a.tgz")).unwrap_err();
        match err {
            StackupError::AllSourcesFailed { component, attempts } => {
                assert_eq!(component, "Neovim editor");
                assert!(attempts.contains(LATEST));
                assert!(attempts.contains(STABLE));
            }
            other => panic!("Expected AllSourcesFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_feed_of_wrong_source() {
        let config = crate::config::StackConfig::builtin().unwrap();
        assert!(Feed::of(config.component("nginx").unwrap()).is_err());
        assert!(Feed::of(config.component("neovim").unwrap()).is_ok());
    }
}
