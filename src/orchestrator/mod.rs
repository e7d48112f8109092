//! Orchestrator
//!
//! Sequences a run: base tooling, OS identification, component selection,
//! vendor repositories, package index refresh, component installs and
//! cleanup. Base tooling and OS identification are mandatory and abort the
//! run; every other step only records its outcome.

pub mod context;
pub mod install;

use std::collections::{BTreeMap, HashSet};

use crate::config::{ComponentSpec, StackConfig};
use crate::error::{Result, StackupError};
use crate::ledger::RunLedger;
use crate::resolver::ResolvedCandidate;
use crate::system::Cmd;
use crate::system::os_release::{OsRelease, native_arch};
use crate::system::repository::Repository;
use context::{Host, RunContext};

/// Options of one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Restrict the run to these component ids
    pub only: Vec<String>,
}

/// Drives one provisioning run
pub struct Orchestrator<'a> {
    ctx: RunContext<'a>,
    only: Vec<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a StackConfig, host: Host, options: RunOptions) -> Self {
        Self {
            ctx: RunContext::new(config, host, options.dry_run),
            only: options.only,
        }
    }

    #[cfg(test)]
    pub fn with_progress(mut self, progress: crate::progress::StepProgress) -> Self {
        self.ctx.progress = progress;
        self
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ctx.ledger
    }

    pub fn resolved(&self) -> &BTreeMap<String, ResolvedCandidate> {
        &self.ctx.resolved
    }

    /// Run every step
    ///
    /// Returns an error only when a mandatory step fails or the component
    /// selection is invalid; failed component steps are in the ledger.
    pub fn run(&mut self) -> Result<()> {
        let config = self.ctx.config;
        let requested = self.requested(config)?;

        self.mandatory("Base tooling", |ctx| {
            ctx.host.packages.update()?;
            if !ctx.config.base_packages.is_empty() {
                ctx.host.packages.install(&ctx.config.base_packages)?;
            }
            Ok(())
        })?;
        self.mandatory("OS identification", identify_os)?;

        let selected = self.confirm(requested)?;
        if selected.is_empty() {
            tracing::info!("no components selected");
        }

        let (registered, unavailable) = self.register_repositories(&selected);
        if registered > 0 {
            self.ctx
                .step("Package index refresh", |ctx| ctx.host.packages.update());
        }

        for spec in &selected {
            if unavailable.contains(spec.id.as_str()) {
                let component = spec.name.clone();
                self.ctx.step(&spec.name, move |_| {
                    Err(StackupError::RepositoryUnavailable { component })
                });
                continue;
            }
            self.ctx
                .step(&spec.name, |ctx| install::install_component(ctx, spec));
        }

        if config.cleanup {
            self.ctx.step("Cleanup", |ctx| {
                ctx.host.packages.autoremove()?;
                ctx.host.packages.clean()
            });
        }

        self.ctx.progress.finish();
        Ok(())
    }

    /// Configured components, restricted to `--only` when given
    fn requested(&self, config: &'a StackConfig) -> Result<Vec<&'a ComponentSpec>> {
        if self.only.is_empty() {
            return Ok(config.components.iter().collect());
        }
        for id in &self.only {
            config.component(id)?;
        }
        Ok(config
            .components
            .iter()
            .filter(|c| self.only.contains(&c.id))
            .collect())
    }

    fn mandatory(
        &mut self,
        label: &str,
        action: impl FnOnce(&mut RunContext<'a>) -> Result<()>,
    ) -> Result<()> {
        let outcome = self.ctx.step(label, action);
        if outcome.success {
            return Ok(());
        }
        self.ctx.progress.finish();
        Err(StackupError::MandatoryStepFailed {
            label: label.to_string(),
            reason: outcome.detail.unwrap_or_default(),
        })
    }

    /// Ask once per component, in catalog order
    fn confirm(&self, requested: Vec<&'a ComponentSpec>) -> Result<Vec<&'a ComponentSpec>> {
        let mut selected = Vec::new();
        for spec in requested {
            let question = format!("Install {}?", spec.name);
            let prompter = &self.ctx.host.prompter;
            let answer = self
                .ctx
                .progress
                .suspend(|| prompter.confirm(&question, spec.default_answer))?;
            if answer {
                selected.push(spec);
            } else {
                tracing::info!(component = %spec.id, "skipped");
            }
        }
        Ok(selected)
    }

    /// Register each selected component's repository
    ///
    /// Returns how many were registered and the ids whose registration failed.
    fn register_repositories(&mut self, selected: &[&'a ComponentSpec]) -> (usize, HashSet<&'a str>) {
        let mut registered = 0;
        let mut unavailable = HashSet::new();

        for &spec in selected {
            let Some(repository) = &spec.repository else {
                continue;
            };
            let label = format!("{} repository", spec.name);
            let outcome = self.ctx.step(&label, |ctx| {
                let rendered = Repository::render(repository, &ctx.host_vars())?;
                ctx.host.repositories.register(&rendered)
            });
            if outcome.success {
                registered += 1;
            } else {
                unavailable.insert(spec.id.as_str());
            }
        }

        (registered, unavailable)
    }
}

fn identify_os(ctx: &mut RunContext<'_>) -> Result<()> {
    let os = OsRelease::from_path(&ctx.config.os_release_path)?;

    let arch = match ctx
        .host
        .runner
        .run(&Cmd::new("dpkg").arg("--print-architecture"))
    {
        Ok(output) if !output.stdout.trim().is_empty() => output.stdout.trim().to_string(),
        Ok(_) => native_arch().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "dpkg architecture query failed");
            native_arch().to_string()
        }
    };

    ctx.progress.suspend(|| {
        println!("  {} ({}, {arch})", os.display_name(), os.codename);
    });
    ctx.arch = arch;
    ctx.os = Some(os);
    Ok(())
}
