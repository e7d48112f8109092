//! Resolve command implementation

use std::path::PathBuf;

use console::Style;

use crate::cli::ResolveArgs;
use crate::config::StackConfig;
use crate::error::Result;
use crate::orchestrator::context::Host;
use crate::resolver::{ResolvedCandidate, VersionResolver};
use crate::system::prompt::AnswerMode;

/// Resolve one component against the package index or the network
///
/// Only read-only queries run; the host is built in dry-run mode.
pub fn run(config_path: Option<PathBuf>, args: ResolveArgs) -> Result<()> {
    let (config, _) = StackConfig::load(config_path.as_deref())?;
    let spec = config.component(&args.id)?;
    let host = Host::system(&config, true, AnswerMode::Defaults)?;

    let candidate =
        VersionResolver::new(host.packages.as_ref(), host.fetcher.as_ref()).resolve(spec)?;
    print!("{}", render(&spec.name, &candidate));
    Ok(())
}

fn render(name: &str, candidate: &ResolvedCandidate) -> String {
    let key = Style::new().bold();
    let mut out = format!("{}\n", Style::new().bold().green().apply_to(name));
    out.push_str(&format!("  {} {}\n", key.apply_to("Candidate:"), candidate.identifier));
    if let Some(version) = &candidate.version {
        out.push_str(&format!("  {} {version}\n", key.apply_to("Version:")));
    }
    out.push_str(&format!("  {} {}\n", key.apply_to("Origin:"), candidate.origin));
    if !candidate.evidence.is_empty() {
        out.push_str(&format!("  {}\n", key.apply_to("Considered:")));
        for entry in &candidate.evidence {
            out.push_str(&format!("    {}\n", Style::new().dim().apply_to(entry)));
        }
    }
    out
}
