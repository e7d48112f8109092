//! Package name matching for conflict families and exclusion lists

use std::collections::BTreeSet;

use wax::{CandidatePath, Glob, Pattern};

use crate::error::{Result, resolve};

/// Exact names plus compiled glob patterns
#[derive(Debug, Clone, Default)]
pub struct PackageMatcher {
    exact: BTreeSet<String>,
    globs: Vec<Glob<'static>>,
}

impl PackageMatcher {
    /// Build a matcher; every pattern must be a valid glob
    pub fn new(exact: &[String], patterns: &[String]) -> Result<Self> {
        let globs = patterns
            .iter()
            .map(|pattern| {
                Glob::new(pattern)
                    .map(Glob::into_owned)
                    .map_err(|e| resolve::invalid_pattern(pattern, e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            exact: exact.iter().cloned().collect(),
            globs,
        })
    }

    /// Build a matcher from a mixed list where entries with glob
    /// metacharacters are patterns and the rest exact names
    pub fn from_entries(entries: &[String]) -> Result<Self> {
        let (patterns, exact): (Vec<String>, Vec<String>) = entries
            .iter()
            .cloned()
            .partition(|e| e.contains(['*', '?', '[']));
        Self::new(&exact, &patterns)
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.exact.contains(name) {
            return true;
        }
        let candidate = CandidatePath::from(name);
        self.globs.iter().any(|glob| glob.matched(&candidate).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.globs.is_empty()
    }
}
