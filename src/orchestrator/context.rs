//! Run context threaded through every step

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::{StackConfig, TemplateVars};
use crate::error::Result;
use crate::executor;
use crate::guard::ServiceStartGuard;
use crate::ledger::{RunLedger, StepOutcome};
use crate::progress::StepProgress;
use crate::resolver::ResolvedCandidate;
use crate::system::apt::{Apt, PackageManager};
use crate::system::http::{Fetcher, HttpFetcher};
use crate::system::os_release::OsRelease;
use crate::system::prompt::{AnswerMode, Prompter};
use crate::system::repository::{AptRepositories, RepositoryRegistrar};
use crate::system::systemd::{ServiceManager, Systemd};
use crate::system::{CommandRunner, SystemRunner};

/// The host collaborators a run works through
pub struct Host {
    pub packages: Rc<dyn PackageManager>,
    pub services: Rc<dyn ServiceManager>,
    pub repositories: Rc<dyn RepositoryRegistrar>,
    pub fetcher: Rc<dyn Fetcher>,
    pub prompter: Rc<dyn Prompter>,
    pub runner: Rc<dyn CommandRunner>,
}

impl Host {
    /// The real host: apt, systemd, reqwest and the terminal
    pub fn system(config: &StackConfig, dry_run: bool, answers: AnswerMode) -> Result<Self> {
        let runner: Rc<dyn CommandRunner> = Rc::new(SystemRunner::new(dry_run));
        let fetcher: Rc<dyn Fetcher> = Rc::new(HttpFetcher::new(&config.http)?);
        Ok(Self {
            packages: Rc::new(Apt::new(runner.clone())),
            services: Rc::new(Systemd::new(runner.clone())),
            repositories: Rc::new(AptRepositories::new(runner.clone(), fetcher.clone(), dry_run)),
            fetcher,
            prompter: answers.prompter(),
            runner,
        })
    }
}

/// Everything one run shares between steps
pub struct RunContext<'a> {
    pub config: &'a StackConfig,
    pub host: Host,
    pub guard: ServiceStartGuard,
    pub ledger: RunLedger,
    pub os: Option<OsRelease>,
    /// Debian architecture of the host
    pub arch: String,
    /// Candidates installed so far, by component id
    pub resolved: BTreeMap<String, ResolvedCandidate>,
    pub dry_run: bool,
    pub progress: StepProgress,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a StackConfig, host: Host, dry_run: bool) -> Self {
        Self {
            config,
            host,
            guard: ServiceStartGuard::new(&config.guard.policy_path),
            ledger: RunLedger::new(),
            os: None,
            arch: String::new(),
            resolved: BTreeMap::new(),
            dry_run,
            progress: StepProgress::new(),
        }
    }

    /// Run one step, record its outcome and return it
    pub fn step(
        &mut self,
        label: &str,
        action: impl FnOnce(&mut RunContext<'a>) -> Result<()>,
    ) -> StepOutcome {
        self.progress.start_step(label);
        let outcome = executor::execute(label, || action(&mut *self));
        self.progress
            .finish_step(label, outcome.success, outcome.detail.as_deref());
        self.ledger.record(outcome.clone());
        outcome
    }

    /// Template variables describing this host
    pub fn host_vars(&self) -> TemplateVars {
        let mut vars = TemplateVars::new();
        if let Some(os) = &self.os {
            vars = vars
                .with("codename", &os.codename)
                .with("distro", &os.id)
                .with("release", &os.version_id);
        }
        if !self.arch.is_empty() {
            vars = vars.with("arch", &self.arch);
        }
        vars
    }
}
