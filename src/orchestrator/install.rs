//! Installing one component
//!
//! Conflict remediation, version resolution, the (optionally guarded)
//! package install with its fallback version, and the post-install
//! service, alternative and version report.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::context::RunContext;
use crate::config::{CandidateSource, ComponentSpec, LinkSpec, TemplateVars};
use crate::error::{Result, StackupError, config};
use crate::executor;
use crate::remediation::ConflictRemediator;
use crate::resolver::release_feed::{self, Feed};
use crate::resolver::{CandidateOrigin, ResolvedCandidate, VersionResolver};
use crate::system::Cmd;
use crate::temp;

/// Install `spec`, recording what was installed in the run context
pub fn install_component(ctx: &mut RunContext<'_>, spec: &ComponentSpec) -> Result<()> {
    remove_conflicts(ctx, spec)?;

    let installed = if spec.is_archive() {
        install_archive(ctx, spec)?
    } else {
        install_packages(ctx, spec)?
    };

    tracing::info!(
        component = %spec.id,
        candidate = %installed.identifier,
        origin = %installed.origin,
        "installed"
    );
    ctx.resolved.insert(spec.id.clone(), installed);
    Ok(())
}

fn remove_conflicts(ctx: &RunContext<'_>, spec: &ComponentSpec) -> Result<()> {
    let Some(name) = &spec.conflicts_with else {
        return Ok(());
    };
    let family = ctx.config.conflict_family(name)?;
    let removed = ConflictRemediator::new(
        ctx.host.packages.as_ref(),
        ctx.host.services.as_ref(),
        ctx.dry_run,
    )
    .remove_conflicting(family)?;

    if !removed.is_empty() && !ctx.dry_run {
        ctx.progress.suspend(|| {
            println!("  Removed conflicting {}: {}", family.name, removed.join(", "));
        });
    }
    Ok(())
}

fn resolver<'c>(ctx: &'c RunContext<'_>) -> VersionResolver<'c> {
    VersionResolver::new(ctx.host.packages.as_ref(), ctx.host.fetcher.as_ref())
}

/// Variables for rendering a component's templates against a candidate
fn candidate_vars(ctx: &RunContext<'_>, candidate: &ResolvedCandidate) -> TemplateVars {
    let vars = ctx.host_vars().with("name", &candidate.identifier);
    match &candidate.version {
        Some(version) => vars.with("version", version),
        None => vars,
    }
}

fn install_packages(ctx: &RunContext<'_>, spec: &ComponentSpec) -> Result<ResolvedCandidate> {
    // Not-found is final: there is no fallback for a candidate that does not exist
    let candidate = resolver(ctx).resolve(spec)?;

    let installed = match &spec.fallback {
        Some(fallback) => executor::with_fallback(
            &spec.name,
            || install_candidate(ctx, spec, &candidate),
            |error| retry_with_fallback(ctx, spec, &candidate, fallback, error),
        )?,
        None => install_candidate(ctx, spec, &candidate)?,
    };

    finish_install(ctx, spec, &installed)?;
    Ok(installed)
}

fn install_candidate(
    ctx: &RunContext<'_>,
    spec: &ComponentSpec,
    candidate: &ResolvedCandidate,
) -> Result<ResolvedCandidate> {
    let packages = candidate_vars(ctx, candidate).render_all(&spec.packages)?;
    tracing::debug!(component = %spec.id, packages = ?packages, "installing");

    if spec.guarded && !ctx.dry_run {
        ctx.guard.scoped(|| ctx.host.packages.install(&packages))?;
    } else {
        ctx.host.packages.install(&packages)?;
    }
    Ok(candidate.clone())
}

/// Purge what the failed version left behind and install the fallback version
///
/// Every failure of the first attempt is retried; the apt error is not
/// classified first.
fn retry_with_fallback(
    ctx: &RunContext<'_>,
    spec: &ComponentSpec,
    failed: &ResolvedCandidate,
    fallback: &str,
    error: StackupError,
) -> Result<ResolvedCandidate> {
    if failed.version.as_deref() == Some(fallback) {
        return Err(error);
    }

    ctx.progress.suspend(|| {
        eprintln!(
            "  {} {} failed, retrying with {fallback}: {error}",
            spec.name,
            failed.version.as_deref().unwrap_or(&failed.identifier)
        );
    });

    let purge = candidate_vars(ctx, failed).render_all(&spec.retry_purge)?;
    if !purge.is_empty() {
        if let Err(e) = ctx.host.packages.purge(&purge) {
            tracing::warn!(packages = ?purge, error = %e, "purge before fallback failed");
        }
    }

    install_candidate(ctx, spec, &fallback_candidate(failed, fallback))
}

fn fallback_candidate(failed: &ResolvedCandidate, fallback: &str) -> ResolvedCandidate {
    let identifier = match &failed.version {
        Some(version) => failed.identifier.replacen(version.as_str(), fallback, 1),
        None => fallback.to_string(),
    };
    ResolvedCandidate {
        identifier,
        version: Some(fallback.to_string()),
        origin: CandidateOrigin::Fallback,
        evidence: failed.evidence.clone(),
    }
}

fn finish_install(
    ctx: &RunContext<'_>,
    spec: &ComponentSpec,
    installed: &ResolvedCandidate,
) -> Result<()> {
    let vars = candidate_vars(ctx, installed);

    for unit in vars.render_all(&spec.services)? {
        ctx.host.services.enable_now(&unit)?;
    }

    if let Some(alternative) = &spec.alternative {
        let path = vars.render(&alternative.path)?;
        ctx.host.packages.set_alternative(&alternative.name, &path)?;
    }

    report_version(ctx, spec);
    Ok(())
}

/// Print the installed tool's version; failures never affect the step
fn report_version(ctx: &RunContext<'_>, spec: &ComponentSpec) {
    let Some((program, args)) = spec.version_command.split_first() else {
        return;
    };
    if ctx.dry_run {
        return;
    }

    match ctx.host.runner.run(&Cmd::new(program).args(args)) {
        Ok(output) => {
            let line = output
                .stdout
                .lines()
                .chain(output.stderr.lines())
                .map(str::trim)
                .find(|l| !l.is_empty());
            if let Some(line) = line {
                ctx.progress.suspend(|| println!("  {line}"));
            }
        }
        Err(e) => tracing::debug!(component = %spec.id, error = %e, "version report failed"),
    }
}

fn install_archive(ctx: &RunContext<'_>, spec: &ComponentSpec) -> Result<ResolvedCandidate> {
    let install_dir = spec.install_dir.as_deref().ok_or_else(|| {
        config::invalid(format!("archive component '{}' needs an install_dir", spec.id))
    })?;
    let candidate = resolver(ctx).resolve(spec)?;

    if ctx.dry_run {
        ctx.progress.suspend(|| {
            println!(
                "[DRY RUN] download {} and extract into {}",
                candidate.identifier,
                install_dir.display()
            );
        });
        return Ok(candidate);
    }

    let base = temp::download_dir_base(ctx.config.download_dir.as_deref());
    fs::create_dir_all(&base)?;
    let staging = TempDir::new_in(&base)?;
    let archive = staging.path().join(archive_file_name(&candidate.identifier));

    let used = match &spec.source {
        CandidateSource::ReleaseFeed { .. } => release_feed::download(
            ctx.host.fetcher.as_ref(),
            &Feed::of(spec)?,
            &candidate,
            &archive,
        )?,
        _ => {
            ctx.host.fetcher.download(&candidate.identifier, &archive)?;
            candidate
        }
    };

    fs::create_dir_all(install_dir)?;
    ctx.host.runner.run(
        &Cmd::new("tar")
            .arg("-xf")
            .arg(archive.display().to_string())
            .arg("-C")
            .arg(install_dir.display().to_string())
            .arg("--strip-components=1")
            .mutating(),
    )?;

    if let Some(link) = &spec.link {
        link_into(install_dir, link)?;
    }

    report_version(ctx, spec);
    Ok(used)
}

/// File name of a download URL, without query or fragment
fn archive_file_name(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
}

/// Point `link.path` at `link.target` inside the install directory
fn link_into(install_dir: &Path, link: &LinkSpec) -> Result<()> {
    let target = install_dir.join(&link.target);
    if let Some(parent) = link.path.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Ok(meta) = fs::symlink_metadata(&link.path) {
        if meta.is_dir() {
            return Err(StackupError::IoError {
                message: format!("{} exists and is a directory", link.path.display()),
            });
        }
        fs::remove_file(&link.path)?;
    }

    symlink(&target, &link.path).map_err(|e| StackupError::IoError {
        message: format!(
            "Failed to link {} -> {}: {e}",
            link.path.display(),
            target.display()
        ),
    })?;
    tracing::debug!(link = %link.path.display(), target = %target.display(), "linked");
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symbolic links need a unix host",
    ))
}
