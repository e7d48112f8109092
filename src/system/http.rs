//! HTTP fetching for release metadata, listing pages and archives

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{Result, fetch};

/// URL → text / file, bounded by a timeout
pub trait Fetcher {
    fn get_text(&self, url: &str) -> Result<String>;

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Download `url` into `dest`, returning the number of bytes written
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Blocking `reqwest` client
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        tracing::debug!(url, "fetching");
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch::failed(url, e.to_string()))
    }
}

impl Fetcher for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        self.get(url)?
            .text()
            .map_err(|e| fetch::failed(url, e.to_string()))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(url)?
            .bytes()
            .map_err(|e| fetch::failed(url, e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.get(url)?;
        let mut file = File::create(dest)
            .map_err(|e| fetch::failed(url, format!("{}: {e}", dest.display())))?;
        let written =
            io::copy(&mut response, &mut file).map_err(|e| fetch::failed(url, e.to_string()))?;
        if written == 0 {
            return Err(fetch::failed(url, "empty response body"));
        }
        tracing::info!(url, bytes = written, "downloaded");
        Ok(written)
    }
}

/// Resolve a link found on a listing page against the page URL
///
/// The base is treated as a directory even without a trailing slash.
pub fn join_url(base: &str, link: &str) -> Result<String> {
    let mut base_url =
        reqwest::Url::parse(base).map_err(|e| fetch::failed(base, format!("invalid URL: {e}")))?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    base_url
        .join(link)
        .map(String::from)
        .map_err(|e| fetch::failed(base, format!("cannot resolve link '{link}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_relative() {
        assert_eq!(
            join_url("https://www.python.org/ftp/python/", "3.12.4/").unwrap(),
            "https://www.python.org/ftp/python/3.12.4/"
        );
        assert_eq!(
            join_url("https://www.python.org/ftp/python", "3.12.4/").unwrap(),
            "https://www.python.org/ftp/python/3.12.4/"
        );
    }

    #[test]
    fn test_join_url_absolute_path() {
        assert_eq!(
            join_url("https://example.org/sources/glib/", "/mirror/glib-2.80.0.tar.xz").unwrap(),
            "https://example.org/mirror/glib-2.80.0.tar.xz"
        );
    }

    #[test]
    fn test_join_url_full_url() {
        assert_eq!(
            join_url("https://example.org/a/", "https://cdn.example.org/b.tgz").unwrap(),
            "https://cdn.example.org/b.tgz"
        );
    }

    #[test]
    fn test_join_url_parent_and_query() {
        assert_eq!(
            join_url("https://example.org/pub/3.12/", "../3.13/Python-3.13.0.tgz").unwrap(),
            "https://example.org/pub/3.13/Python-3.13.0.tgz"
        );
        assert_eq!(
            join_url("https://example.org/pub/3.12/", "Python-3.12.4.tgz?mirror=eu").unwrap(),
            "https://example.org/pub/3.12/Python-3.12.4.tgz?mirror=eu"
        );
    }

    #[test]
    fn test_join_url_invalid_base() {
        assert!(join_url("not a url", "a.tgz").is_err());
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(&HttpConfig::default()).is_ok());
    }
}
