//! Operating system identification from `/etc/os-release`

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, StackupError};

/// The fields of os-release the stack cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// Distribution id (`ubuntu`, `debian`)
    pub id: String,
    /// Release number (`24.04`, `12`)
    pub version_id: String,
    /// Release codename (`noble`, `bookworm`)
    pub codename: String,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| StackupError::OsIdentificationFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|reason| StackupError::OsIdentificationFailed {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parse os-release content; every field but `PRETTY_NAME` is required
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let fields: HashMap<&str, String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim(), unquote(v.trim())))
            .collect();

        let id = fields
            .get("ID")
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or("missing ID")?;
        let version_id = fields
            .get("VERSION_ID")
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or("missing VERSION_ID")?;
        let codename = ["VERSION_CODENAME", "UBUNTU_CODENAME"]
            .iter()
            .filter_map(|k| fields.get(k))
            .find(|v| !v.is_empty())
            .cloned()
            .ok_or("missing VERSION_CODENAME")?;

        Ok(Self {
            id,
            version_id,
            codename,
            pretty_name: fields.get("PRETTY_NAME").cloned(),
        })
    }

    pub fn display_name(&self) -> String {
        self.pretty_name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.id, self.version_id))
    }
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    stripped.to_string()
}

/// Debian architecture name for the running binary
pub fn native_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "i386",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        "s390x" => "s390x",
        other => other,
    }
}
